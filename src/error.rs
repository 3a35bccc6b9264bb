//! Custom error types for eurogdp

use thiserror::Error;

/// Main error type for eurogdp operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Browser session could not be started or a browser command failed
    #[error("Browser error: {0}")]
    Browser(String),

    /// A bot challenge or access-denial page was served
    #[error("Blocked by the source site: {0}")]
    Blocked(String),

    #[error("Timed out after {waited_ms}ms while {stage}")]
    Timeout { stage: String, waited_ms: u64 },

    #[error("Cannot align {labels} geo labels with {rows} table rows")]
    Alignment { labels: usize, rows: usize },

    #[error("Table loaded but no rows could be extracted")]
    EmptyResult,

    /// A single element could not be read
    #[error("Element error: {0}")]
    Element(String),

    #[error("Not initialized: run 'eurogdp init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Only load and table-presence timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    pub(crate) fn timeout(stage: impl Into<String>, waited: std::time::Duration) -> Self {
        Error::Timeout {
            stage: stage.into(),
            waited_ms: waited.as_millis() as u64,
        }
    }
}

/// Result type alias for eurogdp
pub type Result<T> = std::result::Result<T, Error>;
