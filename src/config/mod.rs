//! Configuration management for eurogdp
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::resolve::{MAX_PLAUSIBLE_YEAR, MIN_PLAUSIBLE_YEAR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data browser table to harvest
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Browser session configuration
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Extraction timing and scrolling
    #[serde(default)]
    pub extract: ExtractConfig,

    /// CSS selectors for the grid widget
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Bot-challenge and access-denial detection
    #[serde(default)]
    pub obstacles: ObstacleConfig,

    /// Diagnostic screenshots
    #[serde(default)]
    pub screenshots: ScreenshotConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Browser session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Enable sandbox (disable for Docker/CI environments)
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,

    /// Hard limit for page navigation (milliseconds)
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_ms: u64,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

/// How horizontal scroll stops are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollStrategy {
    /// Start, one third, full width
    ThreeStop,
    /// Monotonic fixed increments from start to end
    Incremental,
}

/// Extraction timing and scrolling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Wait for the grid root to become present and interactable (milliseconds)
    #[serde(default = "default_table_wait")]
    pub table_wait_ms: u64,

    /// Wait for the consent control before giving up on it (milliseconds)
    #[serde(default = "default_consent_wait")]
    pub consent_wait_ms: u64,

    /// Delay between probes in every bounded poll (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay after each scroll for the grid to re-render (milliseconds)
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Attempts for the page-load/table-wait cycle
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Year columns below this are discarded
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    #[serde(default = "default_scroll_strategy")]
    pub scroll_strategy: ScrollStrategy,

    /// Fraction of the visible width advanced per incremental stop
    #[serde(default = "default_step_fraction")]
    pub step_fraction: f64,

    #[serde(default = "default_max_horizontal_stops")]
    pub max_horizontal_stops: u32,

    #[serde(default = "default_max_vertical_stops")]
    pub max_vertical_stops: u32,
}

fn default_scroll_strategy() -> ScrollStrategy {
    ScrollStrategy::Incremental
}

/// CSS selectors and attribute names for the grid widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_table_root_selector")]
    pub table_root: String,

    #[serde(default = "default_consent_selector")]
    pub consent_button: String,

    #[serde(default = "default_header_cell_selector")]
    pub header_cell: String,

    /// Rows of the frozen leading column holding the geo labels
    #[serde(default = "default_pinned_row_selector")]
    pub pinned_row: String,

    /// Rows of the scrollable body holding the year cells
    #[serde(default = "default_body_row_selector")]
    pub body_row: String,

    #[serde(default = "default_cell_selector")]
    pub cell: String,

    #[serde(default = "default_horizontal_scroll_selector")]
    pub horizontal_scroll: String,

    #[serde(default = "default_vertical_scroll_selector")]
    pub vertical_scroll: String,

    #[serde(default = "default_row_id_attribute")]
    pub row_id_attribute: String,

    #[serde(default = "default_col_id_attribute")]
    pub col_id_attribute: String,
}

/// Bot-challenge and access-denial detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Selectors that identify a challenge widget
    #[serde(default = "default_challenge_selectors")]
    pub challenge_selectors: Vec<String>,

    /// Body text markers of an access-denial page (case-insensitive)
    #[serde(default = "default_denial_markers")]
    pub denial_markers: Vec<String>,
}

/// Diagnostic screenshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Directory for screenshots, relative to the base directory unless absolute
    #[serde(default = "default_screenshot_dir")]
    pub dir: String,

    /// Oldest screenshots beyond this count are deleted (0 disables capture)
    #[serde(default = "default_screenshot_max_files")]
    pub max_files: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Also append logs to this file, relative to the base directory unless absolute
    #[serde(default)]
    pub file: Option<String>,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for eurogdp data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            browser: BrowserConfig::default(),
            extract: ExtractConfig::default(),
            selectors: SelectorConfig::default(),
            obstacles: ObstacleConfig::default(),
            screenshots: ScreenshotConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            sandbox: default_sandbox(),
            page_load_timeout_ms: default_page_load_timeout(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            table_wait_ms: default_table_wait(),
            consent_wait_ms: default_consent_wait(),
            poll_interval_ms: default_poll_interval(),
            settle_ms: default_settle(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            min_year: default_min_year(),
            scroll_strategy: default_scroll_strategy(),
            step_fraction: default_step_fraction(),
            max_horizontal_stops: default_max_horizontal_stops(),
            max_vertical_stops: default_max_vertical_stops(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            table_root: default_table_root_selector(),
            consent_button: default_consent_selector(),
            header_cell: default_header_cell_selector(),
            pinned_row: default_pinned_row_selector(),
            body_row: default_body_row_selector(),
            cell: default_cell_selector(),
            horizontal_scroll: default_horizontal_scroll_selector(),
            vertical_scroll: default_vertical_scroll_selector(),
            row_id_attribute: default_row_id_attribute(),
            col_id_attribute: default_col_id_attribute(),
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            challenge_selectors: default_challenge_selectors(),
            denial_markers: default_denial_markers(),
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            dir: default_screenshot_dir(),
            max_files: default_screenshot_max_files(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

impl ExtractConfig {
    pub fn table_wait(&self) -> Duration {
        Duration::from_millis(self.table_wait_ms)
    }

    pub fn consent_wait(&self) -> Duration {
        Duration::from_millis(self.consent_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    /// Get the default base directory for eurogdp (~/.eurogdp)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".eurogdp")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("gdp.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("gdp.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if eurogdp is initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists()
    }

    /// Resolve a configured path against the base directory
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.paths.base_dir.join(path)
        }
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.resolve_path(&self.screenshots.dir)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(|f| self.resolve_path(f))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.source_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "source_url must be http(s), got {}",
                url.scheme()
            )));
        }

        if self.extract.max_attempts == 0 {
            return Err(Error::Config(
                "extract.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.extract.poll_interval_ms == 0 {
            return Err(Error::Config(
                "extract.poll_interval_ms must be positive".to_string(),
            ));
        }

        if self.extract.step_fraction <= 0.0 || self.extract.step_fraction > 1.0 {
            return Err(Error::Config(
                "extract.step_fraction must be in (0.0, 1.0]".to_string(),
            ));
        }

        if !(MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(&self.extract.min_year) {
            return Err(Error::Config(format!(
                "extract.min_year must be between {} and {}",
                MIN_PLAUSIBLE_YEAR, MAX_PLAUSIBLE_YEAR
            )));
        }

        if self.extract.max_horizontal_stops < 3 {
            return Err(Error::Config(
                "extract.max_horizontal_stops must be at least 3".to_string(),
            ));
        }

        if self.extract.max_vertical_stops == 0 {
            return Err(Error::Config(
                "extract.max_vertical_stops must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
