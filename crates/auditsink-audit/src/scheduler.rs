//! Prune scheduler - runs retention passes on a fixed interval
//!
//! ```text
//! interval tick ──→ spawn_blocking(maybe_prune) ──→ log outcome
//!       ▲                                               │
//!       └──────────────── until cancelled ◄─────────────┘
//! ```
//!
//! Prune passes do blocking file I/O, so each one runs on tokio's blocking
//! pool. A failed pass is logged and retried on the next tick. The once-per-day
//! rule inside the pruner keeps frequent ticks cheap.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::pruner::PruneOutcome;
use crate::service::AuditLog;

/// Counters of a finished scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Prune passes attempted
    pub passes: u64,
    /// Passes that rewrote the file
    pub pruned: u64,
    /// Passes that returned an error
    pub failures: u64,
}

/// Periodically triggers [`AuditLog::maybe_prune`]
pub struct PruneScheduler {
    log: Arc<AuditLog>,
    interval: Duration,
}

impl PruneScheduler {
    pub fn new(log: Arc<AuditLog>, interval: Duration) -> Self {
        Self { log, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs until `shutdown` is cancelled
    ///
    /// The first pass runs immediately. A pass in flight when `shutdown`
    /// fires is allowed to finish.
    pub async fn run(&self, shutdown: CancellationToken) -> SchedulerSummary {
        info!(
            path = %self.log.path().display(),
            interval_secs = self.interval.as_secs(),
            "Prune scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = SchedulerSummary::default();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, prune scheduler stopping");
                    break;
                }

                _ = ticker.tick() => {
                    summary.passes += 1;
                    let log = Arc::clone(&self.log);
                    match tokio::task::spawn_blocking(move || log.maybe_prune()).await {
                        Ok(Ok(PruneOutcome::Pruned(report))) => {
                            summary.pruned += 1;
                            info!(kept = report.kept, dropped = report.dropped(), "Scheduled prune pass completed");
                        }
                        Ok(Ok(PruneOutcome::Skipped(reason))) => {
                            debug!(%reason, "Scheduled prune pass skipped");
                        }
                        Ok(Err(e)) => {
                            summary.failures += 1;
                            warn!(error = %e, "Scheduled prune pass failed, retrying next tick");
                        }
                        Err(e) => {
                            summary.failures += 1;
                            error!(error = %e, "Prune task panicked");
                        }
                    }
                }
            }
        }

        info!(
            passes = summary.passes,
            pruned = summary.pruned,
            failures = summary.failures,
            "Prune scheduler stopped"
        );
        summary
    }
}
