//! Status command implementation

use crate::browser::is_browser_available;
use crate::config::Config;
use crate::db::{DbCounts, GdpDb, ScrapeRun};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Runs shown by `status`
const RECENT_RUNS: u32 = 5;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub source_url: String,
    pub browser_available: bool,
    pub counts: DbCounts,
    pub recent_runs: Vec<ScrapeRun>,
}

/// Gather database counts and the latest runs
pub async fn cmd_status(config: &Config, db: &GdpDb) -> Result<StatusInfo> {
    info!("Getting status");

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        source_url: config.source_url.clone(),
        browser_available: is_browser_available(),
        counts: db.counts().await?,
        recent_runs: db.recent_runs(RECENT_RUNS).await?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 eurogdp Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("Source: {}", status.source_url);
    println!(
        "Browser support: {}",
        if status.browser_available {
            "✓ compiled in"
        } else {
            "✗ not available (build with --features browser)"
        }
    );

    println!("\nDatabase Stats:");
    println!("  Geo areas: {}", status.counts.geo_areas);
    println!(
        "  Observations: {} ({} available)",
        status.counts.observations, status.counts.available_observations
    );
    println!("  Scrape runs: {}", status.counts.runs);

    if status.recent_runs.is_empty() {
        println!("\nNo scrape runs yet. Run 'eurogdp scrape' to fetch data.");
        return;
    }

    println!("\nRecent runs:");
    for run in &status.recent_runs {
        let icon = match run.status.as_str() {
            "completed" => "✓",
            "failed" => "✗",
            _ => "…",
        };
        println!(
            "  {} #{} {} {}: {} areas, {} observations, {} skipped",
            icon,
            run.id,
            run.started_at,
            run.status,
            run.areas_processed,
            run.observations_written,
            run.records_skipped
        );
        if let Some(error) = &run.error {
            println!("      {}", error);
        }
    }
}
