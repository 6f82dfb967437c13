//! Periodic expiry sweep for backends without native per-key expiry.

use crate::error::StoreResult;
use async_trait::async_trait;
use hoard_log::{debug, error};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Default period between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A backend that can delete its expired records in one pass.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Delete expired records and return how many were removed.
    async fn sweep(&self) -> StoreResult<usize>;
}

/// Background task running [`Sweep::sweep`] on a fixed period.
///
/// Stopping sends a signal and waits for the task to exit. A sweep that is
/// already running finishes before the task observes the signal, so once
/// [`Sweeper::stop`] returns no sweep is in flight.
pub struct Sweeper {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn the sweep loop. The first sweep runs one `period` after start.
    pub fn start(name: &'static str, period: Duration, target: Arc<dyn Sweep>) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval yields immediately on the first tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match target.sweep().await {
                            Ok(0) => {}
                            Ok(removed) => {
                                debug!(target: "hoard::store::sweeper", "{}: swept {} expired records", name, removed);
                            }
                            Err(e) => {
                                error!(target: "hoard::store::sweeper", "{}: failed to sweep expired records: {}", name, e);
                            }
                        }
                    }
                }
            }

            debug!(target: "hoard::store::sweeper", "{}: sweeper stopped", name);
        });

        Self {
            name,
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the loop to stop and wait for it to exit. Idempotent.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(target: "hoard::store::sweeper", "{}: sweeper task failed: {}", self.name, e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
