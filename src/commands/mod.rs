//! CLI commands implementation

pub mod export;
pub mod init;
pub mod scrape;
pub mod status;

pub use export::*;
pub use init::*;
pub use scrape::*;
pub use status::*;

use crate::config::Config;
use crate::db::GdpDb;
use crate::error::{Error, Result};

/// Open the database of an initialized installation
pub async fn open_existing_db(config: &Config) -> Result<GdpDb> {
    if !config.paths.db_file.exists() {
        return Err(Error::NotInitialized);
    }
    GdpDb::connect(config).await
}
