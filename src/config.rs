//! Configuration types for the voice control session.

use crate::engine::ListenOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Session lifecycle and re-arm policy.
    pub session: SessionConfig,
    /// Options handed to the recognition engine.
    pub recognizer: RecognizerConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Preset bundles of session behaviour.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningProfile {
    /// Always-on session: partial results drive the game, the watchdog
    /// forces a re-arm every period, end of speech re-arms immediately.
    #[default]
    AlwaysOn,
    /// Keyword-triggered session: only final results drive the game. The
    /// watchdog and the end-of-speech re-arm work as in `AlwaysOn`.
    KeywordTriggered,
}

/// Which recognition results are interpreted as commands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    /// In-progress hypotheses drive the game; final results are only logged.
    #[default]
    Partial,
    /// Final results drive the game; partials are only logged.
    Final,
}

/// Session behaviour. Unset fields fall back to the profile's preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub profile: ListeningProfile,
    /// Watchdog period in ms. `0` disables the watchdog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchdog_period_ms: Option<u64>,
    /// Watchdog tick granularity in ms.
    pub watchdog_tick_ms: u64,
    /// Re-arm the engine as soon as it reports end of speech.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rearm_on_end_of_speech: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_source: Option<CommandSource>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile: ListeningProfile::default(),
            watchdog_period_ms: None,
            watchdog_tick_ms: 1_000,
            rearm_on_end_of_speech: None,
            command_source: None,
        }
    }
}

/// Session behaviour after applying the profile preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Zero when the watchdog is disabled.
    pub watchdog_period: Duration,
    pub watchdog_tick: Duration,
    pub rearm_on_end_of_speech: bool,
    pub command_source: CommandSource,
}

impl ListeningProfile {
    /// Preset settings for this profile.
    #[must_use]
    pub fn preset(self) -> SessionSettings {
        match self {
            Self::AlwaysOn => SessionSettings {
                watchdog_period: Duration::from_millis(10_000),
                watchdog_tick: Duration::from_millis(1_000),
                rearm_on_end_of_speech: true,
                command_source: CommandSource::Partial,
            },
            Self::KeywordTriggered => SessionSettings {
                watchdog_period: Duration::from_millis(10_000),
                watchdog_tick: Duration::from_millis(1_000),
                rearm_on_end_of_speech: true,
                command_source: CommandSource::Final,
            },
        }
    }
}

impl SessionConfig {
    /// Resolve explicit overrides on top of the profile preset.
    #[must_use]
    pub fn settings(&self) -> SessionSettings {
        let preset = self.profile.preset();
        SessionSettings {
            watchdog_period: self
                .watchdog_period_ms
                .map_or(preset.watchdog_period, Duration::from_millis),
            watchdog_tick: Duration::from_millis(self.watchdog_tick_ms),
            rearm_on_end_of_speech: self
                .rearm_on_end_of_speech
                .unwrap_or(preset.rearm_on_end_of_speech),
            command_source: self.command_source.unwrap_or(preset.command_source),
        }
    }
}

/// Options handed to the recognition engine on every start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Ask the engine for partial (in-progress) results.
    pub partial_results: bool,
    /// Prefer on-device recognition when the engine supports it.
    pub prefer_offline: bool,
    /// Maximum candidate transcripts per result (at least 1).
    pub max_candidates: u8,
    /// Identity tag sent with every start request.
    pub caller_id: String,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        let options = ListenOptions::default();
        Self {
            partial_results: options.partial_results,
            prefer_offline: options.prefer_offline,
            max_candidates: options.max_candidates,
            caller_id: options.caller_id,
        }
    }
}

impl RecognizerConfig {
    #[must_use]
    pub fn listen_options(&self) -> ListenOptions {
        ListenOptions {
            partial_results: self.partial_results,
            prefer_offline: self.prefer_offline,
            max_candidates: self.max_candidates.max(1),
            caller_id: self.caller_id.clone(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive. `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Also write a daily-rolling log file.
    pub log_to_file: bool,
    /// Directory for log files (None = `<data dir>/logs`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "voxtris=info".to_owned(),
            log_to_file: false,
            log_dir: None,
        }
    }
}

impl VoiceConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::VoiceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::VoiceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::voxtris_dirs::config_dir().join("config.toml")
    }
}
