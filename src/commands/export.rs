//! Export command implementation

use crate::db::GdpDb;
use crate::error::Result;
use std::path::Path;
use tracing::info;

const HEADER: [&str; 6] = ["code", "name", "year", "value", "flag", "is_available"];

/// Write every stored observation to a CSV file, returning the row count
pub async fn cmd_export(db: &GdpDb, path: &Path) -> Result<usize> {
    let rows = db.list_dataset().await?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(HEADER)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Exported {} observations to {}", rows.len(), path.display());
    Ok(rows.len())
}
