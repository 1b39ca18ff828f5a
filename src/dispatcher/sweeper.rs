//! Active Expiry Sweeper
//!
//! Lazy expiry only reclaims keys that get touched again. A key that expires
//! and is never read would otherwise stay in memory forever, so a background
//! task periodically asks the event loop to run a cleanup cycle.
//!
//! The sweeper never touches the storage engine itself. Each tick it submits
//! a cleanup request through the same queue connections use, so cleanup is
//! serialized with client commands.

use crate::dispatcher::Dispatcher;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Period between cleanup cycles when none is configured.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

/// A handle to the running sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the sweeper as a background task, ticking every `interval`.
    pub fn start(dispatcher: Dispatcher, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(dispatcher, interval, shutdown_rx));

        info!(interval_ms = interval.as_millis(), "Expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            info!("Expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    dispatcher: Dispatcher,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match dispatcher.clean_up().await {
            Ok(report) if report.reclaimed > 0 => {
                debug!(
                    rounds = report.rounds,
                    sampled = report.sampled,
                    reclaimed = report.reclaimed,
                    "Expired keys cleaned up"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Expiry sweeper exiting");
                return;
            }
        }
    }
}
