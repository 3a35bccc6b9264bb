//! eurogdp - harvest the Eurostat GDP table into SQLite
//!
//! The data browser renders GDP figures in a virtualized grid: only the
//! cells inside the viewport exist in the DOM. This crate drives a headless
//! browser across that grid, normalizes every cell, joins the pinned
//! country labels to their rows and upserts the result.

pub mod browser;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod resolve;
pub mod screenshots;

pub use error::{Error, Result};
