//! Prune command - runs one retention pass over the audit file

use std::path::Path;

use anyhow::{Context, Result};
use auditsink_audit::{AuditLog, PruneOutcome};
use auditsink_core::domain::RetentionPolicy;
use clap::Args;
use tracing::info;

use super::CommandContext;

/// Arguments for the prune subcommand
#[derive(Debug, Args)]
pub struct PruneCommand {
    /// Override the configured retention window, in days
    #[arg(long, allow_negative_numbers = true)]
    pub keep_days: Option<i64>,
}

impl PruneCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        let log = AuditLog::with_system_adapters(&config, ctx.base_dir());
        let policy = self.policy(log.retention());
        info!(
            path = %log.path().display(),
            keep_for_days = policy.keep_for_days(),
            "Running prune pass"
        );

        let path = log.path().to_path_buf();
        let outcome = tokio::task::spawn_blocking(move || log.prune_with(policy))
            .await
            .context("Prune task failed")?
            .with_context(|| format!("Failed to prune {}", path.display()))?;

        if ctx.is_json() {
            formatter.print_json(&prune_json(&outcome, &path));
        } else {
            match outcome {
                PruneOutcome::Pruned(report) => {
                    formatter.success(&outcome.to_string());
                    formatter.info(&format!(
                        "{} expired, {} undatable, {} bytes filtered under the lock",
                        report.expired, report.undatable, report.tail_bytes
                    ));
                }
                PruneOutcome::Skipped(_) => formatter.info(&outcome.to_string()),
            }
            formatter.info(&format!("File: {}", path.display()));
        }
        Ok(())
    }

    fn policy(&self, configured: RetentionPolicy) -> RetentionPolicy {
        self.keep_days.map(RetentionPolicy::new).unwrap_or(configured)
    }
}

/// Outcome counts plus the resolved audit file
fn prune_json(outcome: &PruneOutcome, path: &Path) -> serde_json::Value {
    let mut json = outcome.to_json();
    json["path"] = serde_json::json!(path.display().to_string());
    json
}
