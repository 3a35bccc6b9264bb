//! Record shapes shared between extraction, resolution and storage.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Data-provider quality annotation on an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "b")]
    BreakInSeries,
    #[serde(rename = "p")]
    Provisional,
    #[serde(rename = "e")]
    Estimated,
}

impl Flag {
    pub const ALL: [Flag; 3] = [Flag::BreakInSeries, Flag::Provisional, Flag::Estimated];

    /// Single-letter code as published and stored
    pub fn code(self) -> &'static str {
        match self {
            Flag::BreakInSeries => "b",
            Flag::Provisional => "p",
            Flag::Estimated => "e",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "b" => Ok(Flag::BreakInSeries),
            "p" => Ok(Flag::Provisional),
            "e" => Ok(Flag::Estimated),
            _ => Err(Error::Other(format!("Unknown flag: {}", s))),
        }
    }
}

/// Normalized content of one grid cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPayload {
    /// Cleaned decimal text, precision kept as published
    pub value: Option<String>,
    pub flag: Option<Flag>,
    pub is_available: bool,
}

impl CellPayload {
    pub fn missing() -> Self {
        Self {
            value: None,
            flag: None,
            is_available: false,
        }
    }
}

/// Year-keyed cells of one source row
pub type YearCells = BTreeMap<i32, CellPayload>;

/// One body row as harvested, before it is tied to a geo area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtractionRow {
    pub row_id: String,
    pub cells: YearCells,
}

impl RawExtractionRow {
    pub fn new(row_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            cells: YearCells::new(),
        }
    }

    pub fn available_years(&self) -> usize {
        self.cells.values().filter(|c| c.is_available).count()
    }
}

/// Label text from the frozen leading column, with the row it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLabel {
    pub row_id: Option<String>,
    pub text: String,
}

/// Complete output of one extraction
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Labels in rendered order
    pub geo_labels: Vec<GeoLabel>,
    /// Rows keyed by row id, in first-sighting order
    pub rows: IndexMap<String, RawExtractionRow>,
    /// Year columns kept, ascending
    pub years: Vec<i32>,
}

/// Geo area attributes as written by the upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoAreaRecord {
    pub code: String,
    pub name: String,
    pub is_eu: bool,
    pub is_euro_area: bool,
    pub is_kosovo: bool,
    pub notes: Option<String>,
}

/// One (area, year) observation as written by the upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub year: i32,
    pub value: Option<String>,
    pub flag: Option<Flag>,
    pub is_available: bool,
}

/// A geo area together with the observations to upsert for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRecord {
    pub area: GeoAreaRecord,
    pub observations: Vec<ObservationRecord>,
}
