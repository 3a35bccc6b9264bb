//! Init command implementation

use crate::config::Config;
use crate::db::GdpDb;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Write the default config, create the database and the screenshot directory
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let mut config = Config::default();
    config.init_paths(base_dir);

    if config.is_initialized() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    config.save()?;

    let db = GdpDb::connect(&config).await?;
    db.close().await;

    std::fs::create_dir_all(config.screenshot_dir())?;

    info!("Initialized eurogdp in {}", config.paths.base_dir.display());
    Ok(config)
}
