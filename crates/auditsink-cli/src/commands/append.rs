//! Append command - records one audit event
//!
//! Opens the audit log the way a host would (one prune pass first), then
//! appends the record. A failed append exits non-zero.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use auditsink_audit::AuditLog;
use auditsink_core::domain::{parse_context_pair, Level, RequestContext};
use clap::Args;
use tracing::info;

use super::CommandContext;

/// Arguments for the append subcommand
#[derive(Debug, Args)]
pub struct AppendCommand {
    /// Severity of the record
    #[arg(long, default_value = "info")]
    pub level: Level,

    /// Event description
    #[arg(long, short)]
    pub message: String,

    /// Context entry as key=value (repeatable)
    #[arg(long = "context", short = 'c', value_parser = parse_context_pair)]
    pub context: Vec<(String, String)>,

    /// Client address
    #[arg(long)]
    pub ip: Option<String>,

    /// Requested URL
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP method of the request
    #[arg(long)]
    pub http_method: Option<String>,

    /// Referring page
    #[arg(long)]
    pub referrer: Option<String>,
}

impl AppendCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        let log = AuditLog::open(&config, ctx.base_dir()).with_request(self.request());
        info!(path = %log.path().display(), level = %self.level, "Appending audit record");

        log.append(self.level, &self.message, self.context_map())
            .with_context(|| format!("Failed to append to {}", log.path().display()))?;

        let recorded = self.level.is_at_least(log.min_level());
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "recorded": recorded,
                "path": log.path().display().to_string(),
                "level": self.level,
            }));
        } else if recorded {
            formatter.success(&format!("Recorded {} event", self.level.label()));
            formatter.info(&format!("File: {}", log.path().display()));
        } else {
            formatter.warn(&format!(
                "{} is below the minimum level {}, nothing recorded",
                self.level,
                log.min_level()
            ));
        }
        Ok(())
    }

    fn request(&self) -> RequestContext {
        RequestContext {
            ip: self.ip.clone(),
            url: self.url.clone(),
            http_method: self.http_method.clone(),
            referrer: self.referrer.clone(),
        }
    }

    fn context_map(&self) -> BTreeMap<String, String> {
        self.context.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        cmd: AppendCommand,
    }

    #[test]
    fn test_parses_level_and_context_pairs() {
        let harness = Harness::try_parse_from([
            "append",
            "--level",
            "Warning",
            "-m",
            "role granted",
            "-c",
            "user=alice",
            "--context",
            "query=a=b",
            "--ip",
            "10.0.0.1",
        ])
        .unwrap();
        let cmd = harness.cmd;

        assert_eq!(cmd.level, Level::Warning);
        assert_eq!(cmd.message, "role granted");

        let context = cmd.context_map();
        assert_eq!(context.get("user").map(String::as_str), Some("alice"));
        assert_eq!(context.get("query").map(String::as_str), Some("a=b"));

        let request = cmd.request();
        assert_eq!(request.ip.as_deref(), Some("10.0.0.1"));
        assert!(request.url.is_none());
    }

    #[test]
    fn test_rejects_bad_level_and_pair() {
        assert!(Harness::try_parse_from(["append", "--level", "loud", "-m", "x"]).is_err());
        assert!(Harness::try_parse_from(["append", "-m", "x", "-c", "novalue"]).is_err());
    }

    #[test]
    fn test_level_defaults_to_info() {
        let harness = Harness::try_parse_from(["append", "-m", "x"]).unwrap();
        assert_eq!(harness.cmd.level, Level::Info);
        assert!(harness.cmd.context.is_empty());
    }
}
