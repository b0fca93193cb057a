//! Liveness timer for the listening session.
//!
//! Some recognizers wedge silently after a long idle listen and never emit
//! another event. [`Watchdog`] counts down a fixed period in ticks and sends a
//! [`WatchdogExpired`] every time it runs out, then starts a fresh countdown.
//! The receiver answers each expiry with an unconditional stop + start.
//!
//! The watchdog never touches the session itself. It runs as its own tokio
//! task and only talks to the session loop through its channel, so all
//! session mutation stays on one task.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// One countdown ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogExpired {
    /// 1-based count of expiries since the watchdog started.
    pub count: u64,
}

/// Repeating countdown that requests a forced session restart.
pub struct Watchdog {
    expiry_tx: mpsc::UnboundedSender<WatchdogExpired>,
    cancel: CancellationToken,
    period: Duration,
    tick: Duration,
}

impl Watchdog {
    /// Create a watchdog with the given period and tick granularity.
    ///
    /// Call [`run`](Self::run) to start counting. A zero tick counts the whole
    /// period in one step.
    pub fn new(
        expiry_tx: mpsc::UnboundedSender<WatchdogExpired>,
        cancel: CancellationToken,
        period: Duration,
        tick: Duration,
    ) -> Self {
        let tick = if tick.is_zero() { period } else { tick.min(period) };
        Self {
            expiry_tx,
            cancel,
            period,
            tick,
        }
    }

    /// Run until cancelled or until the receiver goes away.
    ///
    /// Intended to be spawned:
    ///
    /// ```rust,ignore
    /// let watchdog = Watchdog::new(expiry_tx, cancel.child_token(), period, tick);
    /// tokio::spawn(watchdog.run());
    /// ```
    pub async fn run(self) {
        if self.period.is_zero() {
            debug!("session watchdog disabled");
            return;
        }

        info!(
            period_ms = self.period.as_millis() as u64,
            tick_ms = self.tick.as_millis() as u64,
            "session watchdog started"
        );

        let mut count = 0u64;
        'countdown: loop {
            let mut remaining = self.period;
            while !remaining.is_zero() {
                let step = self.tick.min(remaining);
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        info!("session watchdog cancelled");
                        break 'countdown;
                    }
                    () = tokio::time::sleep(step) => {}
                }
                remaining = remaining.saturating_sub(step);
                trace!(remaining_ms = remaining.as_millis() as u64, "watchdog tick");
            }

            count += 1;
            debug!(count, "session watchdog expired");
            if self.expiry_tx.send(WatchdogExpired { count }).is_err() {
                warn!("session watchdog: receiver closed, stopping");
                break;
            }
        }
    }
}
