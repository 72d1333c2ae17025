//! Server configuration
//!
//! Read from an optional TOML file, then overridden by `QUARRY_*`
//! environment variables and command-line flags (clap reads both).

use anyhow::{Context, Result};
use clap::Parser;
use quarry_core::ConnectorSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE: &str = "quarry.db";

#[derive(Debug, Clone, Parser)]
#[command(name = "quarry", version, about = "Multi-tenant data source connector")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "QUARRY_BIND")]
    pub bind: Option<String>,

    /// Path of the SQLite directory database
    #[arg(long, env = "QUARRY_DATABASE")]
    pub database: Option<PathBuf>,

    /// Directory for JSON log files
    #[arg(long, env = "QUARRY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write JSON log files
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub database: PathBuf,
    pub connector: ConnectorSettings,
    pub logging: LogSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: PathBuf::from(DEFAULT_DATABASE),
            connector: ConnectorSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub log_dir: Option<PathBuf>,
    /// Write daily-rolling JSON log files
    pub json: bool,
    /// Default `EnvFilter` directives; `RUST_LOG` still wins
    pub filter: Option<String>,
}

impl ServerConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    /// Load `path`, or the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                Self::from_toml(&text).with_context(|| format!("Invalid config file {:?}", path))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line and environment overrides
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(bind) = &cli.bind {
            self.bind = bind.clone();
        }
        if let Some(database) = &cli.database {
            self.database = database.clone();
        }
        if let Some(log_dir) = &cli.log_dir {
            self.logging.log_dir = Some(log_dir.clone());
        }
        if cli.json_logs {
            self.logging.json = true;
        }
        self
    }
}

#[cfg(test)]
mod tests;
