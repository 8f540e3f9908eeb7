//! [`Args`] definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Config, LogLevel};

/// Terminal front-end of the campus session manager.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Directory to persist the session into, overriding the configured one.
    #[arg(long, value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Log level, overriding the configured one.
    #[arg(long, value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }

    /// Applies the overrides of these [`Args`] to the provided [`Config`].
    #[must_use]
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(dir) = self.storage_dir {
            config.storage.dir = dir;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        config
    }
}
