//! In-memory grid page for tests
//!
//! Models the parts of a virtualized AG Grid the extractor relies on: a
//! horizontal column window, a vertical row window, a pinned label column,
//! a consent banner and obstacle pages. Knobs inject load failures and
//! unreadable cells.

use super::{Axis, ElementRef, GridPage, ScrollMetrics};
use crate::config::{Config, SelectorConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ROW_HEIGHT: f64 = 40.0;

/// Default config with millisecond-scale waits and no settle delay
pub(crate) fn fast_config() -> Config {
    let mut config = Config::default();
    config.source_url = "https://example.test/databrowser/gdp".to_string();
    config.browser.page_load_timeout_ms = 1_000;
    config.extract.table_wait_ms = 20;
    config.extract.consent_wait_ms = 10;
    config.extract.poll_interval_ms = 2;
    config.extract.settle_ms = 0;
    config.extract.retry_backoff_ms = 1;
    config.screenshots.max_files = 0;
    config
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Root,
    Consent,
    Header(usize),
    Pinned(usize),
    Row(usize),
    Cell(usize, usize),
}

/// One body row: its `row-id` and displayed text per column id
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedRow {
    pub id: String,
    pub cells: HashMap<String, String>,
}

#[derive(Debug)]
pub(crate) struct ScriptedGrid {
    selectors: SelectorConfig,

    pub columns: Vec<String>,
    pub labels: Vec<String>,
    pub rows: Vec<ScriptedRow>,

    pub column_width: f64,
    pub viewport_width: f64,
    pub visible_rows: usize,

    /// Pinned rows carry the body row's id
    pub label_row_ids: bool,
    /// Navigations that end without a table before it finally renders
    pub table_absent_loads: u32,
    /// Leading navigations that never finish
    pub slow_loads: u32,
    /// Leading navigations the browser reports as timed out
    pub load_timeouts: u32,
    pub captcha: bool,
    pub denial_text: Option<String>,
    pub consent_banner: bool,
    pub consent_click_fails: bool,
    /// (row id, column id) pairs whose text cannot be read
    pub failing_cells: HashSet<(String, String)>,

    pub navigations: u32,
    pub consent_clicks: u32,
    pub screenshots: Vec<PathBuf>,
    pub closed: bool,
    pub releases: u32,
    /// Most element handles alive at once
    pub peak_handles: usize,

    pub scroll_left: f64,
    pub top_row: usize,
    table_present: bool,
    consent_accepted: bool,
    nodes: HashMap<u64, Node>,
    next_id: u64,
}

impl ScriptedGrid {
    pub const HORIZONTAL: &'static str = ".ag-body-horizontal-scroll-viewport";
    pub const VERTICAL: &'static str = ".ag-body-viewport";

    pub fn new(labels: &[&str], columns: &[&str], rows: &[(&str, &[(&str, &str)])]) -> Self {
        Self {
            selectors: SelectorConfig::default(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(id, cells)| ScriptedRow {
                    id: id.to_string(),
                    cells: cells
                        .iter()
                        .map(|(col, text)| (col.to_string(), text.to_string()))
                        .collect(),
                })
                .collect(),
            column_width: 100.0,
            viewport_width: 1000.0,
            visible_rows: 20,
            label_row_ids: false,
            table_absent_loads: 0,
            slow_loads: 0,
            load_timeouts: 0,
            captcha: false,
            denial_text: None,
            consent_banner: false,
            consent_click_fails: false,
            failing_cells: HashSet::new(),
            navigations: 0,
            consent_clicks: 0,
            screenshots: Vec::new(),
            closed: false,
            releases: 0,
            peak_handles: 0,
            scroll_left: 0.0,
            top_row: 0,
            table_present: false,
            consent_accepted: false,
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    /// A grid with year columns and no rows
    pub fn with_years(years: &[i32]) -> Self {
        let columns: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        Self::new(&[], &columns, &[])
    }

    /// Render the table without a navigation
    pub fn present_table(&mut self) {
        self.table_present = true;
    }

    /// Element handles registered since construction
    pub fn handles_issued(&self) -> usize {
        self.next_id as usize
    }

    pub fn max_scroll_left(&self) -> f64 {
        (self.columns.len() as f64 * self.column_width - self.viewport_width).max(0.0)
    }

    fn row_positions(&self) -> usize {
        self.labels.len().max(self.rows.len())
    }

    fn max_top_row(&self) -> usize {
        self.row_positions().saturating_sub(self.visible_rows)
    }

    fn visible_columns(&self) -> Vec<usize> {
        let left = self.scroll_left;
        let right = left + self.viewport_width;
        (0..self.columns.len())
            .filter(|&c| {
                let start = c as f64 * self.column_width;
                start < right && start + self.column_width > left
            })
            .collect()
    }

    fn visible_positions(&self) -> std::ops::Range<usize> {
        let end = (self.top_row + self.visible_rows).min(self.row_positions());
        self.top_row.min(end)..end
    }

    fn register(&mut self, node: Node) -> ElementRef {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        self.peak_handles = self.peak_handles.max(self.nodes.len());
        ElementRef(id)
    }

    fn node(&self, element: ElementRef) -> Result<Node> {
        self.nodes
            .get(&element.0)
            .copied()
            .ok_or_else(|| Error::Element(format!("stale element handle {}", element.0)))
    }

    fn is_container(&self, selector: &str) -> Option<Axis> {
        if selector == Self::HORIZONTAL {
            Some(Axis::Horizontal)
        } else if selector == Self::VERTICAL {
            Some(Axis::Vertical)
        } else {
            None
        }
    }
}

#[async_trait]
impl GridPage for ScriptedGrid {
    async fn navigate(&mut self, _url: &str) -> Result<()> {
        self.navigations += 1;
        self.nodes.clear();
        self.scroll_left = 0.0;
        self.top_row = 0;
        self.consent_accepted = false;
        self.table_present = self.navigations > self.table_absent_loads;
        if self.navigations <= self.load_timeouts {
            return Err(Error::timeout("loading the page", Duration::from_millis(30_000)));
        }
        if self.navigations <= self.slow_loads {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(())
    }

    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>> {
        let mut found = Vec::new();

        if selector == self.selectors.consent_button {
            if self.consent_banner && self.navigations > 0 && !self.consent_accepted {
                found.push(Node::Consent);
            }
        } else if !self.table_present {
            // Nothing of the grid exists yet.
        } else if selector == self.selectors.table_root {
            found.push(Node::Root);
        } else if selector == self.selectors.header_cell {
            found.extend(self.visible_columns().into_iter().map(Node::Header));
        } else if selector == self.selectors.pinned_row {
            let labels = self.labels.len();
            found.extend(self.visible_positions().filter(|&i| i < labels).map(Node::Pinned));
        } else if selector == self.selectors.body_row {
            let rows = self.rows.len();
            found.extend(self.visible_positions().filter(|&i| i < rows).map(Node::Row));
        }

        Ok(found.into_iter().map(|n| self.register(n)).collect())
    }

    async fn find_within(&mut self, parent: ElementRef, selector: &str) -> Result<Vec<ElementRef>> {
        let found: Vec<Node> = match self.node(parent)? {
            Node::Row(i) if selector == self.selectors.cell => self
                .visible_columns()
                .into_iter()
                .map(|c| Node::Cell(i, c))
                .collect(),
            _ => Vec::new(),
        };
        Ok(found.into_iter().map(|n| self.register(n)).collect())
    }

    async fn text(&mut self, element: ElementRef) -> Result<String> {
        Ok(match self.node(element)? {
            Node::Root => String::new(),
            Node::Consent => "Accept all cookies".to_string(),
            Node::Header(c) => self.columns[c].clone(),
            Node::Pinned(i) => self.labels[i].clone(),
            Node::Row(i) => self.rows[i].id.clone(),
            Node::Cell(i, c) => {
                let row = &self.rows[i];
                let col = &self.columns[c];
                if self.failing_cells.contains(&(row.id.clone(), col.clone())) {
                    return Err(Error::Element(format!("cell {}/{} detached", row.id, col)));
                }
                row.cells.get(col).cloned().unwrap_or_default()
            }
        })
    }

    async fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>> {
        let node = self.node(element)?;
        let value = if name == self.selectors.col_id_attribute {
            match node {
                Node::Header(c) | Node::Cell(_, c) => Some(self.columns[c].clone()),
                _ => None,
            }
        } else if name == self.selectors.row_id_attribute {
            match node {
                Node::Row(i) => Some(self.rows[i].id.clone()),
                Node::Pinned(i) if self.label_row_ids => self.rows.get(i).map(|r| r.id.clone()),
                _ => None,
            }
        } else {
            None
        };
        Ok(value)
    }

    async fn is_interactable(&mut self, element: ElementRef) -> Result<bool> {
        self.node(element)?;
        Ok(true)
    }

    async fn click(&mut self, element: ElementRef) -> Result<()> {
        if self.node(element)? == Node::Consent {
            self.consent_clicks += 1;
            if self.consent_click_fails {
                return Err(Error::Element("consent button is covered".to_string()));
            }
            self.consent_accepted = true;
        }
        Ok(())
    }

    async fn scroll_metrics(&mut self, container: &str) -> Result<Option<ScrollMetrics>> {
        if !self.table_present || self.is_container(container).is_none() {
            return Ok(None);
        }
        Ok(Some(ScrollMetrics {
            scroll_left: self.scroll_left,
            scroll_top: self.top_row as f64 * ROW_HEIGHT,
            scroll_width: self.columns.len() as f64 * self.column_width,
            scroll_height: self.row_positions() as f64 * ROW_HEIGHT,
            client_width: self.viewport_width,
            client_height: self.visible_rows as f64 * ROW_HEIGHT,
        }))
    }

    async fn set_scroll(&mut self, container: &str, axis: Axis, offset: f64) -> Result<()> {
        if !self.table_present || self.is_container(container) != Some(axis) {
            return Err(Error::Element(format!("scroll container {} not found", container)));
        }
        match axis {
            Axis::Horizontal => self.scroll_left = offset.clamp(0.0, self.max_scroll_left()),
            Axis::Vertical => {
                let row = (offset.max(0.0) / ROW_HEIGHT).floor() as usize;
                self.top_row = row.min(self.max_top_row());
            }
        }
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: ElementRef) -> Result<()> {
        match self.node(element)? {
            Node::Pinned(i) | Node::Row(i) | Node::Cell(i, _) => {
                self.top_row = i.min(self.max_top_row());
            }
            _ => {}
        }
        Ok(())
    }

    async fn page_html(&mut self) -> Result<String> {
        let mut body = String::new();
        if let Some(text) = &self.denial_text {
            body.push_str(&format!("<h1>{}</h1>", text));
        }
        if self.captcha {
            body.push_str(r#"<iframe src="https://www.google.com/recaptcha/api2/anchor"></iframe>"#);
        }
        if self.table_present {
            body.push_str(r#"<div class="ag-theme-alpine"><div class="ag-root"></div></div>"#);
        }
        Ok(format!(
            "<html><head><title>GDP</title></head><body>{}</body></html>",
            body
        ))
    }

    fn release_elements(&mut self) {
        self.releases += 1;
        self.nodes.clear();
    }

    async fn screenshot(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, b"\x89PNG")?;
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.nodes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_column_window_follows_scroll() {
        let mut grid = ScriptedGrid::with_years(&[2020, 2021, 2022, 2023, 2024]);
        grid.viewport_width = 200.0;
        grid.navigate("https://example.test").await.unwrap();

        let headers = grid.find_all(".ag-header-viewport .ag-header-cell").await.unwrap();
        assert_eq!(headers.len(), 2);

        grid.set_scroll(ScriptedGrid::HORIZONTAL, Axis::Horizontal, 300.0)
            .await
            .unwrap();
        let headers = grid.find_all(".ag-header-viewport .ag-header-cell").await.unwrap();
        let mut texts = Vec::new();
        for h in headers {
            texts.push(grid.text(h).await.unwrap());
        }
        assert_eq!(texts, vec!["2023", "2024"]);
    }

    #[tokio::test]
    async fn test_table_absent_until_configured_load() {
        let mut grid = ScriptedGrid::with_years(&[2023]);
        grid.table_absent_loads = 1;

        grid.navigate("https://example.test").await.unwrap();
        assert!(grid.find_all(".ag-theme-alpine").await.unwrap().is_empty());

        grid.navigate("https://example.test").await.unwrap();
        assert_eq!(grid.find_all(".ag-theme-alpine").await.unwrap().len(), 1);
    }
}
