//! Console harness for the voice control session.
//!
//! Reads utterances from stdin, runs them through a full session and writes
//! every `VoiceEvent` to stdout as a JSON line. All tracing output goes to
//! stderr so that stdout stays machine readable.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use voxtris::VoiceConfig;
use voxtris::config::ListeningProfile;

/// Voxtris: hands-free voice control for a falling-block game.
#[derive(Parser)]
#[command(name = "voxtris-console", version, about)]
struct Cli {
    /// Path to TOML configuration file. Defaults to the user config file if present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening profile, overriding the config file.
    #[arg(short, long, value_enum)]
    profile: Option<ProfileArg>,

    /// Watchdog period in milliseconds (0 disables).
    #[arg(long)]
    watchdog_ms: Option<u64>,

    /// Pretend speech recognition is missing on this device.
    #[arg(long)]
    unavailable: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    AlwaysOn,
    KeywordTriggered,
}

impl From<ProfileArg> for ListeningProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::AlwaysOn => Self::AlwaysOn,
            ProfileArg::KeywordTriggered => Self::KeywordTriggered,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<VoiceConfig> {
    let mut config = match &cli.config {
        Some(path) => VoiceConfig::from_file(path)?,
        None => {
            let path = VoiceConfig::default_config_path();
            if path.exists() {
                VoiceConfig::from_file(&path)?
            } else {
                VoiceConfig::default()
            }
        }
    };

    if let Some(profile) = cli.profile {
        config.session.profile = profile.into();
    }
    if let Some(ms) = cli.watchdog_ms {
        config.session.watchdog_period_ms = Some(ms);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let _log_guard = voxtris::logging::init_tracing(&config.logging)?;

    tracing::info!(profile = ?config.session.profile, "voxtris-console starting");

    let report = voxtris::stdio::run_stdio_session(&config, !cli.unavailable)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "voice session exited with error");
            anyhow::anyhow!("voice session failed: {e}")
        })?;

    tracing::info!(
        final_state = %report.final_state,
        stats = ?report.stats,
        "voxtris-console shut down cleanly"
    );
    Ok(())
}
