use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{error::AppResult, services::stores::InteractionLog};

/// Deletes every interaction older than `cutoff`, exposure records included
///
/// Idempotent: rerunning with the same cutoff deletes nothing new, so a
/// failed or skipped run only delays cleanup.
pub async fn sweep_once(log: &dyn InteractionLog, cutoff: DateTime<Utc>) -> AppResult<u64> {
    let deleted = log.delete_before(cutoff).await?;
    tracing::info!(deleted, cutoff = %cutoff, "Retention sweep completed");
    Ok(deleted)
}

/// Periodic background task purging interactions past the retention window
pub struct RetentionSweeper {
    log: Arc<dyn InteractionLog>,
    retention: chrono::Duration,
    interval: Duration,
}

/// Handle for stopping a spawned sweeper
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper, cancelling a sweep in progress, and waits for it
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Retention sweeper task failed");
        }
        tracing::info!("Retention sweeper stopped");
    }
}

impl RetentionSweeper {
    pub fn new(log: Arc<dyn InteractionLog>, retention: chrono::Duration, interval: Duration) -> Self {
        Self {
            log,
            retention,
            interval,
        }
    }

    /// Spawns the sweep loop; the first sweep runs immediately
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        SweeperHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            retention_days = self.retention.num_days(),
            interval_secs = self.interval.as_secs(),
            "Retention sweeper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => break,
            }

            let cutoff = Utc::now() - self.retention;
            tokio::select! {
                result = sweep_once(self.log.as_ref(), cutoff) => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Retention sweep failed, retrying next interval");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::warn!("Retention sweep interrupted by shutdown");
                    break;
                }
            }
        }
    }
}
