//! SQLite schema definition

/// SQL schema for the GDP database
pub const SCHEMA_SQL: &str = r#"
-- Geo areas: countries, aggregates and special-status territories
CREATE TABLE IF NOT EXISTS geo_areas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    is_eu INTEGER NOT NULL DEFAULT 0,
    is_euro_area INTEGER NOT NULL DEFAULT 0,
    is_kosovo INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Observations: one value per (area, year)
CREATE TABLE IF NOT EXISTS gdp_observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    geo_area_id INTEGER NOT NULL REFERENCES geo_areas(id) ON DELETE CASCADE,
    year INTEGER NOT NULL,
    value TEXT,
    flag TEXT CHECK (flag IS NULL OR flag IN ('b', 'p', 'e')),
    is_available INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(geo_area_id, year)
);

-- Scrape runs: tracking history
CREATE TABLE IF NOT EXISTS scrape_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL,
    areas_processed INTEGER NOT NULL DEFAULT 0,
    observations_written INTEGER NOT NULL DEFAULT 0,
    records_skipped INTEGER NOT NULL DEFAULT 0,
    error TEXT
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_observations_year ON gdp_observations(year);
CREATE INDEX IF NOT EXISTS idx_runs_started ON scrape_runs(started_at);
"#;
