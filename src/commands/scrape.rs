//! Scrape command - extract the GDP table and upsert it into the database

use crate::browser::{ChromeSession, GridPage};
use crate::commands::cmd_export;
use crate::config::Config;
use crate::db::{GdpDb, RunStatus, RunTotals};
use crate::error::{Error, Result};
use crate::extract::TableExtractor;
use crate::models::Extraction;
use crate::resolve::resolve;
use crate::screenshots::ScreenshotKeeper;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Scrape options from the command line
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub headless: Option<bool>,
    pub sandbox: Option<bool>,
    /// Export the full dataset here after a successful import
    pub csv: Option<PathBuf>,
}

impl ScrapeOptions {
    fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(sandbox) = self.sandbox {
            config.browser.sandbox = sandbox;
        }
        config
    }
}

/// Scrape statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeStats {
    pub run_id: i64,
    pub rows_extracted: usize,
    pub years: Vec<i32>,
    pub areas_created: u64,
    pub areas_updated: u64,
    pub observations_written: u64,
    pub rows_without_data: usize,
    /// Unparseable labels plus records the database rejected
    pub records_skipped: u64,
    pub csv_rows: Option<usize>,
    pub duration_secs: f64,
}

impl ScrapeStats {
    fn totals(&self) -> RunTotals {
        RunTotals {
            areas_processed: self.areas_created + self.areas_updated,
            observations_written: self.observations_written,
            records_skipped: self.records_skipped,
        }
    }
}

/// Launch Chrome, extract the table and store it as one recorded run
pub async fn cmd_scrape(
    config: &Config,
    db: &GdpDb,
    options: ScrapeOptions,
) -> Result<ScrapeStats> {
    let config = options.apply(config);
    config.validate()?;

    recorded(db, options.csv.as_deref(), async {
        let mut session = ChromeSession::launch(&config.browser).await?;
        scrape_page(&config, db, &mut session).await
    })
    .await
}

/// Same as [`cmd_scrape`] against an already open page
pub async fn scrape_with_page<P: GridPage + ?Sized>(
    config: &Config,
    db: &GdpDb,
    page: &mut P,
    csv: Option<&Path>,
) -> Result<ScrapeStats> {
    recorded(db, csv, scrape_page(config, db, page)).await
}

async fn scrape_page<P: GridPage + ?Sized>(
    config: &Config,
    db: &GdpDb,
    page: &mut P,
) -> Result<ScrapeStats> {
    let extraction = extract_with_session(config, page).await?;
    import_extraction(db, &extraction).await
}

/// Run the extractor and close the page whatever the outcome
pub async fn extract_with_session<P: GridPage + ?Sized>(
    config: &Config,
    page: &mut P,
) -> Result<Extraction> {
    let result = match TableExtractor::new(config, ScreenshotKeeper::from_config(config)) {
        Ok(mut extractor) => extractor.extract(page).await,
        Err(e) => Err(e),
    };

    if let Err(e) = page.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    result
}

/// Resolve an extraction and upsert it in a single transaction
pub async fn import_extraction(db: &GdpDb, extraction: &Extraction) -> Result<ScrapeStats> {
    if extraction.rows.is_empty() {
        return Err(Error::EmptyResult);
    }

    let resolution = resolve(extraction)?;
    let import = db.import(&resolution.records).await?;

    info!(
        "Stored {} areas ({} new) and {} observations",
        import.areas_processed(),
        import.areas_created,
        import.observations_written
    );

    Ok(ScrapeStats {
        rows_extracted: extraction.rows.len(),
        years: extraction.years.clone(),
        areas_created: import.areas_created,
        areas_updated: import.areas_updated,
        observations_written: import.observations_written,
        rows_without_data: resolution.rows_without_data,
        records_skipped: resolution.skipped_labels.len() as u64 + import.failed(),
        ..Default::default()
    })
}

/// Wrap scrape work in a `scrape_runs` entry that always gets finished
async fn recorded<F>(db: &GdpDb, csv: Option<&Path>, work: F) -> Result<ScrapeStats>
where
    F: Future<Output = Result<ScrapeStats>>,
{
    let started = Instant::now();
    let run_id = db.start_run().await?;
    info!("Started scrape run #{}", run_id);

    match work.await {
        Ok(mut stats) => {
            stats.run_id = run_id;
            db.finish_run(run_id, RunStatus::Completed, stats.totals(), None)
                .await?;
            if let Some(path) = csv {
                stats.csv_rows = Some(cmd_export(db, path).await?);
            }
            stats.duration_secs = started.elapsed().as_secs_f64();
            Ok(stats)
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(record_err) = db
                .finish_run(run_id, RunStatus::Failed, RunTotals::default(), Some(&message))
                .await
            {
                warn!("Failed to record failed run #{}: {}", run_id, record_err);
            }
            Err(e)
        }
    }
}

/// Print scrape statistics
pub fn print_scrape_stats(stats: &ScrapeStats) {
    println!("\n📈 Scrape Complete (run #{})\n", stats.run_id);
    println!("Rows extracted: {}", stats.rows_extracted);
    if let (Some(first), Some(last)) = (stats.years.first(), stats.years.last()) {
        println!("Years: {}-{} ({} columns)", first, last, stats.years.len());
    }
    println!("Geo areas created: {}", stats.areas_created);
    println!("Geo areas updated: {}", stats.areas_updated);
    println!("Observations written: {}", stats.observations_written);
    if stats.rows_without_data > 0 {
        println!("Areas without data: {}", stats.rows_without_data);
    }
    if stats.records_skipped > 0 {
        println!("Records skipped: {}", stats.records_skipped);
    }
    if let Some(rows) = stats.csv_rows {
        println!("CSV rows exported: {}", rows);
    }
    println!("Duration: {:.1}s", stats.duration_secs);
}
