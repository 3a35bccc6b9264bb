//! GDP storage using SQLite
//!
//! This module handles all persisted state:
//! - Geo areas (one row per stable code)
//! - GDP observations (one row per area and year)
//! - Scrape runs (history and stats)

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Flag, GeoAreaRecord, GeoRecord, ObservationRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::FromRow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Primary SQLite result code shared by every constraint failure
const SQLITE_CONSTRAINT: i32 = 19;

/// Scrape run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(Error::Other(format!("Unknown run status: {}", s))),
        }
    }
}

/// A stored geo area
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GeoArea {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_eu: bool,
    pub is_euro_area: bool,
    pub is_kosovo: bool,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored observation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GdpObservation {
    pub id: i64,
    pub geo_area_id: i64,
    pub year: i64,
    pub value: Option<String>,
    pub flag: Option<String>,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl GdpObservation {
    pub fn flag(&self) -> Result<Option<Flag>> {
        self.flag.as_deref().map(str::parse::<Flag>).transpose()
    }
}

/// A scrape run record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub areas_processed: i64,
    pub observations_written: i64,
    pub records_skipped: i64,
    pub error: Option<String>,
}

impl ScrapeRun {
    pub fn get_status(&self) -> Result<RunStatus> {
        self.status.parse()
    }
}

/// One exported line: an observation with its area
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DatasetRow {
    pub code: String,
    pub name: String,
    pub year: i64,
    pub value: Option<String>,
    pub flag: Option<String>,
    pub is_available: bool,
}

/// Outcome of one import batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub areas_created: u64,
    pub areas_updated: u64,
    pub observations_written: u64,
    pub failed_areas: u64,
    pub failed_observations: u64,
}

impl ImportStats {
    pub fn areas_processed(&self) -> u64 {
        self.areas_created + self.areas_updated
    }

    pub fn failed(&self) -> u64 {
        self.failed_areas + self.failed_observations
    }
}

/// Totals recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub areas_processed: u64,
    pub observations_written: u64,
    pub records_skipped: u64,
}

/// Row counts for status output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbCounts {
    pub geo_areas: i64,
    pub observations: i64,
    pub available_observations: i64,
    pub runs: i64,
}

/// GDP database handle
pub struct GdpDb {
    pool: SqlitePool,
}

impl GdpDb {
    /// Connect to the database configured in `paths.db_file`
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open (creating if needed) a database file and ensure the schema exists
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create tables if they do not exist
    pub async fn init_schema(&self) -> Result<()> {
        debug!("Ensuring database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ===== Import =====

    /// Upsert a batch of records in a single transaction.
    ///
    /// Constraint failures on one record are counted and skipped; any other
    /// database error rolls the whole batch back.
    pub async fn import(&self, records: &[GeoRecord]) -> Result<ImportStats> {
        let mut tx = self.pool.begin().await?;
        let mut stats = ImportStats::default();
        let now = Utc::now().to_rfc3339();

        for record in records {
            let area_id = match upsert_area(&mut *tx, &record.area, &now).await {
                Ok((id, created)) => {
                    if created {
                        stats.areas_created += 1;
                    } else {
                        stats.areas_updated += 1;
                    }
                    id
                }
                Err(e) if is_record_error(&e) => {
                    warn!("Skipping geo area {}: {}", record.area.code, e);
                    stats.failed_areas += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for obs in &record.observations {
                match upsert_observation(&mut *tx, area_id, obs, &now).await {
                    Ok(()) => stats.observations_written += 1,
                    Err(e) if is_record_error(&e) => {
                        warn!(
                            "Skipping observation {}/{}: {}",
                            record.area.code, obs.year, e
                        );
                        stats.failed_observations += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        tx.commit().await?;
        info!(
            "Imported {} geo areas ({} new), {} observations, {} failures",
            stats.areas_processed(),
            stats.areas_created,
            stats.observations_written,
            stats.failed()
        );
        Ok(stats)
    }

    // ===== Queries =====

    pub async fn counts(&self) -> Result<DbCounts> {
        let (geo_areas,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM geo_areas")
            .fetch_one(&self.pool)
            .await?;
        let (observations, available_observations): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_available), 0) FROM gdp_observations",
        )
        .fetch_one(&self.pool)
        .await?;
        let (runs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrape_runs")
            .fetch_one(&self.pool)
            .await?;

        Ok(DbCounts {
            geo_areas,
            observations,
            available_observations,
            runs,
        })
    }

    pub async fn get_geo_area(&self, code: &str) -> Result<Option<GeoArea>> {
        let area = sqlx::query_as::<_, GeoArea>("SELECT * FROM geo_areas WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(area)
    }

    /// Observations of one area, by year
    pub async fn observations_for(&self, code: &str) -> Result<Vec<GdpObservation>> {
        let observations = sqlx::query_as::<_, GdpObservation>(
            r#"
            SELECT o.* FROM gdp_observations o
            JOIN geo_areas g ON g.id = o.geo_area_id
            WHERE g.code = ?
            ORDER BY o.year
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;
        Ok(observations)
    }

    /// Every stored observation with its area, ordered by code then year
    pub async fn list_dataset(&self) -> Result<Vec<DatasetRow>> {
        let rows = sqlx::query_as::<_, DatasetRow>(
            r#"
            SELECT g.code, g.name, o.year, o.value, o.flag, o.is_available
            FROM gdp_observations o
            JOIN geo_areas g ON g.id = o.geo_area_id
            ORDER BY g.code, o.year
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete an area and, by cascade, its observations
    pub async fn delete_geo_area(&self, code: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM geo_areas WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ===== Run history =====

    pub async fn start_run(&self) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO scrape_runs (started_at, status) VALUES (?, ?) RETURNING id",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(RunStatus::Running.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn finish_run(
        &self,
        id: i64,
        status: RunStatus,
        totals: RunTotals,
        error: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE scrape_runs
            SET completed_at = ?, status = ?, areas_processed = ?,
                observations_written = ?, records_skipped = ?, error = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(status.to_string())
        .bind(totals.areas_processed as i64)
        .bind(totals.observations_written as i64)
        .bind(totals.records_skipped as i64)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<ScrapeRun>> {
        let runs = sqlx::query_as::<_, ScrapeRun>(
            "SELECT * FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(runs)
    }
}

/// Insert or update an area, returning its id and whether it was new
async fn upsert_area(
    conn: &mut SqliteConnection,
    area: &GeoAreaRecord,
    now: &str,
) -> std::result::Result<(i64, bool), sqlx::Error> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM geo_areas WHERE code = ?")
        .bind(&area.code)
        .fetch_optional(&mut *conn)
        .await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO geo_areas (code, name, is_eu, is_euro_area, is_kosovo, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            is_eu = excluded.is_eu,
            is_euro_area = excluded.is_euro_area,
            is_kosovo = excluded.is_kosovo,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(&area.code)
    .bind(&area.name)
    .bind(area.is_eu)
    .bind(area.is_euro_area)
    .bind(area.is_kosovo)
    .bind(&area.notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok((id, existing.is_none()))
}

async fn upsert_observation(
    conn: &mut SqliteConnection,
    geo_area_id: i64,
    obs: &ObservationRecord,
    now: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO gdp_observations (geo_area_id, year, value, flag, is_available, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(geo_area_id, year) DO UPDATE SET
            value = excluded.value,
            flag = excluded.flag,
            is_available = excluded.is_available,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(geo_area_id)
    .bind(obs.year)
    .bind(&obs.value)
    .bind(obs.flag.map(Flag::code))
    .bind(obs.is_available)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Failures confined to one record: constraint violations and bad values
fn is_record_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            !matches!(db.kind(), ErrorKind::Other)
                || db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map_or(false, |code| code & 0xff == SQLITE_CONSTRAINT)
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => true,
        _ => false,
    }
}
