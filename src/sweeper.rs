use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::config::SweepConfig;
use crate::donations::InventoryStore;

/// Returns abandoned claims to the available pool.
///
/// A claim is abandoned once `claimed_at` is at least `grace` old. Reverting
/// leaves `quantity` as it was when the claim was made, so a donation that was
/// fully claimed comes back with zero servings until someone restocks it.
pub struct ExpirySweeper {
    inventory: Arc<dyn InventoryStore>,
    grace: time::Duration,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(inventory: Arc<dyn InventoryStore>, cfg: &SweepConfig) -> Self {
        Self {
            inventory,
            grace: cfg.grace(),
            interval: cfg.interval(),
        }
    }

    /// One pass as of `now`. Idempotent: a second pass with no new claims
    /// reverts nothing.
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: OffsetDateTime) -> anyhow::Result<u64> {
        let threshold = now - self.grace;
        let reverted = self.inventory.revert_stale_claims(threshold).await?;
        if reverted > 0 {
            info!(reverted, %threshold, "reset expired claims to available");
        } else {
            debug!("no expired claims");
        }
        Ok(reverted)
    }

    /// Spawns the periodic loop. The first pass runs immediately.
    pub fn start(self: Arc<Self>) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval = ?self.interval, grace = %self.grace, "expiry sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once(OffsetDateTime::now_utc()).await {
                            error!(error = %e, "sweep failed, retrying next tick");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("expiry sweeper stopped");
        });
        SweeperHandle { stop_tx, task }
    }
}

/// Running sweeper. Dropping it without `stop` leaves the loop to exit on
/// its own once the sender is gone.
pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the loop and waits for an in-flight pass to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "sweeper task ended abnormally");
        }
    }
}
