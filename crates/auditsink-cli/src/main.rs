//! auditsink CLI - Command-line interface for the audit log sink
//!
//! Provides commands for:
//! - Appending audit records
//! - Running a retention prune pass
//! - Pruning on a schedule until interrupted
//! - Inspecting and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use auditsink_core::config::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    append::AppendCommand, completions::CompletionsCommand, config::ConfigCommand,
    prune::PruneCommand, schedule::ScheduleCommand, CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "auditsink",
    version,
    about = "Append-only audit log with retention pruning"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Append one audit record
    Append(AppendCommand),
    /// Run one retention prune pass
    Prune(PruneCommand),
    /// Prune periodically until interrupted
    Schedule(ScheduleCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Diagnostic filter: `-v` flags win over the configured level, `-q` only
/// reports errors.
fn log_filter(cli: &Cli, config: &Config) -> String {
    match (cli.quiet, cli.verbose) {
        (true, 0) => "error".to_string(),
        (_, 0) => config.logging.level.clone(),
        (_, 1) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let log_config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = log_filter(&cli, &log_config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if log_config.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CommandContext::new(format, config_path, cli.quiet);

    match cli.command {
        Commands::Append(cmd) => cmd.execute(&ctx).await,
        Commands::Prune(cmd) => cmd.execute(&ctx).await,
        Commands::Schedule(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
