//! CLI subcommands

pub mod append;
pub mod completions;
pub mod config;
pub mod prune;
pub mod schedule;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use auditsink_core::config::Config;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(format: OutputFormat, config_path: PathBuf, quiet: bool) -> Self {
        Self {
            format,
            config_path,
            quiet,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    /// Loads the config file, or the defaults when it does not exist
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        Config::load(&self.config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }

    /// Directory a relative `audit.file` is resolved against
    pub fn base_dir(&self) -> &Path {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
