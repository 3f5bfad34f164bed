//! Schedule command - prunes on an interval until SIGINT or SIGTERM

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use auditsink_audit::{AuditLog, PruneScheduler};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::CommandContext;

/// Arguments for the schedule subcommand
#[derive(Debug, Args)]
pub struct ScheduleCommand {
    /// Seconds between prune passes
    #[arg(long, default_value_t = 3600)]
    pub interval_secs: u64,
}

impl ScheduleCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("--interval-secs must be at least 1");
        }

        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        let log = Arc::new(AuditLog::with_system_adapters(&config, ctx.base_dir()));
        let scheduler = PruneScheduler::new(Arc::clone(&log), Duration::from_secs(self.interval_secs));

        formatter.success(&format!(
            "Pruning {} every {}s (Ctrl+C to stop)",
            log.path().display(),
            self.interval_secs
        ));

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            signal_token.cancel();
        });

        let summary = scheduler.run(shutdown).await;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "path": log.path().display().to_string(),
                "passes": summary.passes,
                "pruned": summary.pruned,
                "failures": summary.failures,
            }));
        } else {
            formatter.success(&format!(
                "Stopped after {} passes ({} pruned, {} failed)",
                summary.passes, summary.pruned, summary.failures
            ));
        }
        Ok(())
    }
}

/// Resolves on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
