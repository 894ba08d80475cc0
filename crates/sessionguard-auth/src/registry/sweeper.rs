//! Periodic cross-user pruning of stale sessions.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

use sessionguard_core::result::AppResult;

use super::index::SessionRegistry;

/// Totals of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Users whose index was examined.
    pub users: u32,
    /// Stale sessions removed.
    pub pruned: u32,
}

/// Runs `prune_expired` for every user on a fixed interval.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    registry: SessionRegistry,
    interval: Duration,
}

impl SessionSweeper {
    /// Create a sweeper.
    pub fn new(registry: SessionRegistry, interval: Duration) -> Self {
        Self { registry, interval }
    }

    /// Sweep every user once.
    pub async fn run_once(&self) -> AppResult<SweepReport> {
        let usernames = self.registry.usernames().await?;
        let mut report = SweepReport::default();

        for username in &usernames {
            report.users += 1;
            report.pruned += self.registry.prune_expired(username).await;
        }

        info!(users = report.users, pruned = report.pruned, "Session sweep completed");
        Ok(report)
    }

    /// Sweep on every tick until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Session sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Session sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Session sweeper stopped");
    }
}
