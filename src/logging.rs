//! Process-wide logging setup
//!
//! Built once from the config file and CLI flags, then installed by `main`.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::LogWriterFactory;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Logging options resolved from config and command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when RUST_LOG is unset
    pub level: String,
    pub json: bool,
    /// Append log lines to this file as well
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LogConfig {
    pub fn from_config(config: &Config, verbose: bool, json: bool) -> Self {
        Self {
            level: if verbose {
                "debug".to_string()
            } else {
                config.logging.level.clone()
            },
            json: json || config.logging.json,
            file: config.log_file(),
        }
    }

    /// RUST_LOG wins over the configured level
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    pub fn install(&self) -> Result<()> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if self.json {
            layers.push(
                fmt::layer()
                    .json()
                    .with_writer(LogWriterFactory)
                    .boxed(),
            );
        } else {
            layers.push(fmt::layer().with_writer(LogWriterFactory).boxed());
        }

        if let Some(path) = &self.file {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = Mutex::new(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            layers.push(if self.json {
                layer.json().boxed()
            } else {
                layer.boxed()
            });
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(self.filter())
            .try_init()
            .map_err(|e| Error::Other(format!("Failed to install logger: {}", e)))
    }
}
