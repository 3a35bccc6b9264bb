//! Table extraction from the virtualized grid
//!
//! One extraction is a sequence of bounded steps: load the page, check for
//! obstacles, dismiss the consent banner, wait for the grid, then visit every
//! horizontal stop to collect year headers and cell values while sweeping the
//! row window top to bottom. Only timeouts are retried.

mod state;

pub use state::ExtractionState;

use crate::browser::{
    plan_horizontal_stops, Axis, ElementRef, GridPage, ObstacleDetector, ScrollOutcome,
    ViewportScroller,
};
use crate::config::{Config, ExtractConfig, SelectorConfig};
use crate::error::{Error, Result};
use crate::models::{Extraction, GeoLabel, RawExtractionRow};
use crate::normalize::normalize_cell;
use crate::progress::harvest_bar;
use crate::resolve::parse_year;
use crate::screenshots::ScreenshotKeeper;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// What a row sweep collects
enum Harvest<'a> {
    /// Pinned-column labels keyed by row id (or text when the row has none)
    Labels(&'a mut IndexMap<String, GeoLabel>),
    /// Body cells keyed by row id, plus every year column seen
    Cells {
        rows: &'a mut IndexMap<String, RawExtractionRow>,
        years: &'a mut BTreeSet<i32>,
    },
}

impl Harvest<'_> {
    fn row_selector<'s>(&self, selectors: &'s SelectorConfig) -> &'s str {
        match self {
            Harvest::Labels(_) => &selectors.pinned_row,
            Harvest::Cells { .. } => &selectors.body_row,
        }
    }
}

/// Drives one browser page through a full grid extraction
pub struct TableExtractor {
    source_url: String,
    page_load_timeout: Duration,
    extract: ExtractConfig,
    selectors: SelectorConfig,
    detector: ObstacleDetector,
    scroller: ViewportScroller,
    screenshots: ScreenshotKeeper,
    state: ExtractionState,
}

impl TableExtractor {
    pub fn new(config: &Config, screenshots: ScreenshotKeeper) -> Result<Self> {
        Ok(Self {
            source_url: config.source_url.clone(),
            page_load_timeout: Duration::from_millis(config.browser.page_load_timeout_ms),
            extract: config.extract.clone(),
            selectors: config.selectors.clone(),
            detector: ObstacleDetector::new(&config.obstacles)?,
            scroller: ViewportScroller::from_config(&config.selectors, &config.extract),
            screenshots,
            state: ExtractionState::NotStarted,
        })
    }

    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    fn transition(&mut self, next: ExtractionState) {
        debug!("Extraction state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run the extraction, retrying timeouts up to `max_attempts` times.
    ///
    /// A loaded table without any rows is returned as an empty [`Extraction`];
    /// the caller decides whether that is fatal.
    pub async fn extract<P: GridPage + ?Sized>(&mut self, page: &mut P) -> Result<Extraction> {
        let max_attempts = self.extract.max_attempts;
        let mut attempt = 1;

        loop {
            match self.attempt(page, attempt).await {
                Ok(extraction) => {
                    self.transition(ExtractionState::Done);
                    return Ok(extraction);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        self.extract.retry_backoff()
                    );
                    self.screenshots.capture(page, "timeout_error").await;
                    sleep(self.extract.retry_backoff()).await;
                    attempt += 1;
                }
                Err(e) => {
                    let label = match &e {
                        Error::Timeout { .. } => "timeout_error",
                        Error::Blocked(_) => "blocked",
                        _ => "extract_error",
                    };
                    self.screenshots.capture(page, label).await;
                    self.transition(ExtractionState::Failed(e.to_string()));
                    return Err(e);
                }
            }
        }
    }

    async fn attempt<P: GridPage + ?Sized>(
        &mut self,
        page: &mut P,
        attempt: u32,
    ) -> Result<Extraction> {
        self.transition(ExtractionState::PageLoading { attempt });
        self.load_page(page).await?;
        self.screenshots.capture(page, "page_loaded").await;
        self.detector.check(page).await?;

        self.transition(ExtractionState::ConsentHandling);
        self.handle_consent(page).await;

        self.transition(ExtractionState::AwaitingTable);
        self.wait_for_table(page).await?;

        let (mut years, stops) = self.scan_year_columns(page).await?;

        self.transition(ExtractionState::HarvestingHeaders);
        let geo_labels = self.harvest_labels(page).await?;
        info!("Read {} geo labels", geo_labels.len());

        self.transition(ExtractionState::HarvestingRows);
        let rows = self.harvest_rows(page, &stops, &mut years).await?;

        let extraction = Extraction {
            geo_labels,
            rows,
            years: years.into_iter().collect(),
        };

        if extraction.rows.is_empty() {
            warn!("Table loaded but no rows could be read");
        } else {
            info!(
                "Extracted {} rows across {} year columns",
                extraction.rows.len(),
                extraction.years.len()
            );
        }

        Ok(extraction)
    }

    async fn load_page<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<()> {
        info!("Loading {}", self.source_url);
        match timeout(self.page_load_timeout, page.navigate(&self.source_url)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("loading the page", self.page_load_timeout)),
        }
    }

    /// Poll until an element matching `selector` is interactable or `wait` runs out
    async fn poll_for<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        selector: &str,
        wait: Duration,
    ) -> Option<ElementRef> {
        let deadline = Instant::now() + wait;
        loop {
            match page.find_all(selector).await {
                Ok(found) => {
                    if let Some(&element) = found.first() {
                        match page.is_interactable(element).await {
                            Ok(true) => return Some(element),
                            Ok(false) => debug!("{} present but not interactable yet", selector),
                            Err(e) => debug!("Interactable probe for {} failed: {}", selector, e),
                        }
                    }
                }
                Err(e) => debug!("Probe for {} failed: {}", selector, e),
            }

            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.extract.poll_interval()).await;
        }
    }

    /// Consent problems never fail the extraction
    async fn handle_consent<P: GridPage + ?Sized>(&self, page: &mut P) {
        let wait = self.extract.consent_wait();
        let Some(button) = self
            .poll_for(page, &self.selectors.consent_button, wait)
            .await
        else {
            debug!("No consent banner within {:?}", wait);
            return;
        };

        match page.click(button).await {
            Ok(()) => {
                info!("Accepted cookie consent");
                self.screenshots.capture(page, "consent_accepted").await;
            }
            Err(e) => {
                warn!("Consent click failed, continuing: {}", e);
                self.screenshots.capture(page, "consent_error").await;
            }
        }
    }

    async fn wait_for_table<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<()> {
        let wait = self.extract.table_wait();
        match self.poll_for(page, &self.selectors.table_root, wait).await {
            Some(_) => {
                debug!("Table root {} is ready", self.selectors.table_root);
                Ok(())
            }
            None => Err(Error::timeout("waiting for the table", wait)),
        }
    }

    /// Visit every horizontal stop and collect the year headers rendered there
    async fn scan_year_columns<P: GridPage + ?Sized>(
        &mut self,
        page: &mut P,
    ) -> Result<(BTreeSet<i32>, Vec<f64>)> {
        self.scroller.scroll_to_start(page).await?;

        let stops = match self.scroller.metrics(page, Axis::Horizontal).await? {
            Some(metrics) => plan_horizontal_stops(
                &metrics,
                self.extract.scroll_strategy,
                self.extract.step_fraction,
                self.extract.max_horizontal_stops as usize,
            ),
            None => {
                warn!("Horizontal scroll container missing; reading the visible columns only");
                vec![0.0]
            }
        };

        let mut years = BTreeSet::new();
        for (i, &offset) in stops.iter().enumerate() {
            self.transition(ExtractionState::ScrollingColumns {
                stop: i + 1,
                of: stops.len(),
            });
            self.scroller
                .scroll_to_offset(page, Axis::Horizontal, offset)
                .await?;

            page.release_elements();
            let found = self.read_header_years(page).await;
            debug!(
                "Stop {}/{} at {:.0}px shows years {:?}",
                i + 1,
                stops.len(),
                offset,
                found
            );
            years.extend(found);
        }

        let seen = years.len();
        years.retain(|year| *year >= self.extract.min_year);
        if seen > years.len() {
            debug!(
                "Dropped {} year columns before {}",
                seen - years.len(),
                self.extract.min_year
            );
        }

        match (years.first(), years.last()) {
            (Some(first), Some(last)) => info!(
                "Found {} year columns ({}-{}) over {} scroll stops",
                years.len(),
                first,
                last,
                stops.len()
            ),
            _ => warn!("No year columns found at or after {}", self.extract.min_year),
        }

        Ok((years, stops))
    }

    async fn read_header_years<P: GridPage + ?Sized>(&self, page: &mut P) -> Vec<i32> {
        let headers = match page.find_all(&self.selectors.header_cell).await {
            Ok(headers) => headers,
            Err(e) => {
                warn!("Could not list header cells: {}", e);
                return Vec::new();
            }
        };

        let mut years = Vec::new();
        for header in headers {
            let col_id = match page.attribute(header, &self.selectors.col_id_attribute).await {
                Ok(col_id) => col_id,
                Err(e) => {
                    debug!("Header without readable column id: {}", e);
                    None
                }
            };

            let year = match col_id.as_deref().and_then(parse_year) {
                Some(year) => Some(year),
                None => match page.text(header).await {
                    Ok(text) => parse_year(&text),
                    Err(e) => {
                        warn!("Skipping unreadable header {:?}: {}", col_id, e);
                        None
                    }
                },
            };
            years.extend(year);
        }
        years
    }

    async fn harvest_labels<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<Vec<GeoLabel>> {
        let mut labels = IndexMap::new();
        self.scroller.scroll_to_top(page).await?;
        self.sweep(page, &mut Harvest::Labels(&mut labels)).await?;
        Ok(labels.into_values().collect())
    }

    async fn harvest_rows<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        stops: &[f64],
        years: &mut BTreeSet<i32>,
    ) -> Result<IndexMap<String, RawExtractionRow>> {
        let mut rows = IndexMap::new();
        let bar = harvest_bar(stops.len() as u64);

        for &offset in stops {
            self.scroller
                .scroll_to_offset(page, Axis::Horizontal, offset)
                .await?;
            self.scroller.scroll_to_top(page).await?;

            let mut harvest = Harvest::Cells {
                rows: &mut rows,
                years: &mut *years,
            };
            if let Err(e) = self.sweep(page, &mut harvest).await {
                bar.abandon();
                return Err(e);
            }

            bar.inc(1);
            bar.set_message(format!("{} rows", rows.len()));
        }

        bar.finish_and_clear();
        Ok(rows)
    }

    /// Walk the row window from the top until no new rows appear
    async fn sweep<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        harvest: &mut Harvest<'_>,
    ) -> Result<()> {
        let selector = harvest.row_selector(&self.selectors).to_string();
        let mut seen = HashSet::new();
        page.release_elements();

        for pass in 0..self.extract.max_vertical_stops {
            let visible = match page.find_all(&selector).await {
                Ok(visible) => visible,
                Err(e) => {
                    warn!("Could not list rows {}: {}", selector, e);
                    break;
                }
            };

            let fresh = self.harvest_visible(page, harvest, &visible, &mut seen).await;
            let Some(&last) = visible.last() else {
                break;
            };
            if fresh == 0 && pass > 0 {
                break;
            }

            if let Err(e) = self.scroller.scroll_element_into_view(page, last).await {
                warn!("Could not bring the next rows into view: {}", e);
                break;
            }
        }

        if let ScrollOutcome::Moved(_) = self.scroller.scroll_to_bottom(page).await? {
            match page.find_all(&selector).await {
                Ok(visible) => {
                    self.harvest_visible(page, harvest, &visible, &mut seen).await;
                }
                Err(e) => warn!("Could not list rows {} at the bottom: {}", selector, e),
            }
        }

        debug!("Sweep of {} saw {} rows", selector, seen.len());
        Ok(())
    }

    /// Read the visible rows, returning how many were not seen before
    async fn harvest_visible<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        harvest: &mut Harvest<'_>,
        visible: &[ElementRef],
        seen: &mut HashSet<String>,
    ) -> usize {
        let mut fresh = 0;
        for &row in visible {
            let key = match harvest {
                Harvest::Labels(labels) => self.read_label(page, row, labels).await,
                Harvest::Cells { rows, years } => self.read_row(page, row, rows, years).await,
            };
            if let Some(key) = key {
                if seen.insert(key) {
                    fresh += 1;
                }
            }
        }
        fresh
    }

    async fn read_label<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        row: ElementRef,
        labels: &mut IndexMap<String, GeoLabel>,
    ) -> Option<String> {
        let row_id = match page.attribute(row, &self.selectors.row_id_attribute).await {
            Ok(row_id) => row_id,
            Err(e) => {
                debug!("Label row without readable id: {}", e);
                None
            }
        };

        let text = match page.text(row).await {
            Ok(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
            Err(e) => {
                warn!("Skipping unreadable label row {:?}: {}", row_id, e);
                return None;
            }
        };
        if text.is_empty() {
            return None;
        }

        let key = row_id.clone().unwrap_or_else(|| text.clone());
        labels
            .entry(key.clone())
            .or_insert(GeoLabel { row_id, text });
        Some(key)
    }

    async fn read_row<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        row: ElementRef,
        rows: &mut IndexMap<String, RawExtractionRow>,
        years: &mut BTreeSet<i32>,
    ) -> Option<String> {
        let row_id = match page.attribute(row, &self.selectors.row_id_attribute).await {
            Ok(Some(row_id)) => row_id,
            Ok(None) => {
                warn!(
                    "Skipping body row without a {} attribute",
                    self.selectors.row_id_attribute
                );
                return None;
            }
            Err(e) => {
                warn!("Skipping unreadable body row: {}", e);
                return None;
            }
        };

        let entry = rows
            .entry(row_id.clone())
            .or_insert_with(|| RawExtractionRow::new(row_id.clone()));

        let cells = match page.find_within(row, &self.selectors.cell).await {
            Ok(cells) => cells,
            Err(e) => {
                warn!("Row {}: could not list cells: {}", row_id, e);
                return Some(row_id);
            }
        };

        for cell in cells {
            let col_id = match page.attribute(cell, &self.selectors.col_id_attribute).await {
                Ok(Some(col_id)) => col_id,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Row {}: unreadable column id: {}", row_id, e);
                    continue;
                }
            };

            let Some(year) = parse_year(&col_id) else {
                continue;
            };
            if year < self.extract.min_year {
                continue;
            }

            match page.text(cell).await {
                Ok(text) => {
                    entry.cells.insert(year, normalize_cell(&text));
                    years.insert(year);
                }
                Err(e) => warn!("Row {} year {}: skipping cell: {}", row_id, year, e),
            }
        }

        Some(row_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scripted::{fast_config, ScriptedGrid};
    use crate::models::Flag;
    use tempfile::TempDir;

    /// Twelve year columns (2012-2023), five countries, three columns and
    /// two rows visible at a time.
    fn virtualized_grid() -> ScriptedGrid {
        let countries = ["BE", "DE", "FR", "IT", "NL"];
        let labels: Vec<String> = countries
            .iter()
            .map(|c| format!("[{}] Country {}", c, c))
            .collect();
        let columns: Vec<String> = (2012..=2023).map(|y| y.to_string()).collect();

        let mut grid = ScriptedGrid::new(
            &labels.iter().map(String::as_str).collect::<Vec<_>>(),
            &columns.iter().map(String::as_str).collect::<Vec<_>>(),
            &[],
        );
        for (i, code) in countries.iter().enumerate() {
            let mut row = crate::browser::scripted::ScriptedRow {
                id: format!("r{}", i),
                ..Default::default()
            };
            for year in 2012..=2023 {
                row.cells
                    .insert(year.to_string(), format!("{} {},{}", i + 1, year, code.len()));
            }
            grid.rows.push(row);
        }
        grid.viewport_width = 300.0;
        grid.visible_rows = 2;
        grid
    }

    #[tokio::test]
    async fn test_extracts_all_columns_and_rows_through_virtualization() {
        let config = fast_config();
        let mut grid = virtualized_grid();
        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();

        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(extraction.years, (2014..=2023).collect::<Vec<_>>());
        assert_eq!(extraction.geo_labels.len(), 5);
        assert_eq!(extraction.geo_labels[0].text, "[BE] Country BE");
        assert_eq!(extraction.geo_labels[4].text, "[NL] Country NL");

        let ids: Vec<&str> = extraction.rows.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["r0", "r1", "r2", "r3", "r4"]);
        for row in extraction.rows.values() {
            assert_eq!(row.cells.len(), 10, "row {}", row.row_id);
            assert!(!row.cells.contains_key(&2013));
        }
        assert_eq!(
            extraction.rows["r2"].cells[&2020].value.as_deref(),
            Some("32020.2")
        );
        assert_eq!(extractor.state(), &ExtractionState::Done);
        assert_eq!(grid.navigations, 1);
    }

    #[tokio::test]
    async fn test_three_stop_strategy_covers_a_narrow_overflow() {
        let mut config = fast_config();
        config.extract.scroll_strategy = crate::config::ScrollStrategy::ThreeStop;
        let mut grid = ScriptedGrid::new(
            &["[BE] Belgium"],
            &["2018", "2019", "2020", "2021", "2022", "2023"],
            &[(
                "row1",
                &[
                    ("2018", "1"),
                    ("2019", "2"),
                    ("2020", "3"),
                    ("2021", "4"),
                    ("2022", "5"),
                    ("2023", "6"),
                ],
            )],
        );
        grid.viewport_width = 300.0;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(extraction.years, vec![2018, 2019, 2020, 2021, 2022, 2023]);
        assert_eq!(extraction.rows["row1"].available_years(), 6);
    }

    #[tokio::test]
    async fn test_bad_cell_does_not_void_the_row() {
        let config = fast_config();
        let mut grid = ScriptedGrid::new(
            &["[BE] Belgium", "[FR] France"],
            &["2022", "2023"],
            &[
                ("row1", &[("2022", "99,0"), ("2023", "100,5 (p)")]),
                ("row2", &[("2022", "7,5"), ("2023", "8,25")]),
            ],
        );
        grid.failing_cells
            .insert(("row2".to_string(), "2023".to_string()));

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        let be = &extraction.rows["row1"];
        assert_eq!(be.cells[&2023].flag, Some(Flag::Provisional));
        assert_eq!(be.cells[&2023].value.as_deref(), Some("100.5"));

        let fr = &extraction.rows["row2"];
        assert_eq!(fr.cells.len(), 1);
        assert_eq!(fr.cells[&2022].value.as_deref(), Some("7.5"));
    }

    #[tokio::test]
    async fn test_consent_banner_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let config = fast_config();
        let mut grid = ScriptedGrid::new(&["[BE] Belgium"], &["2023"], &[("row1", &[("2023", "1")])]);
        grid.consent_banner = true;

        let keeper = ScreenshotKeeper::new(tmp.path(), 10);
        let mut extractor = TableExtractor::new(&config, keeper).unwrap();
        extractor.extract(&mut grid).await.unwrap();

        assert_eq!(grid.consent_clicks, 1);
        let names: Vec<String> = grid
            .screenshots
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();
        assert!(names[0].starts_with("page_loaded_"));
        assert!(names[1].starts_with("consent_accepted_"));
    }

    #[tokio::test]
    async fn test_consent_failure_is_not_fatal() {
        let config = fast_config();
        let mut grid = ScriptedGrid::new(&["[BE] Belgium"], &["2023"], &[("row1", &[("2023", "1")])]);
        grid.consent_banner = true;
        grid.consent_click_fails = true;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(grid.consent_clicks, 1);
        assert_eq!(extraction.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_challenge_aborts_without_retry() {
        let tmp = TempDir::new().unwrap();
        let config = fast_config();
        let mut grid = ScriptedGrid::with_years(&[2023]);
        grid.captcha = true;

        let keeper = ScreenshotKeeper::new(tmp.path(), 10);
        let mut extractor = TableExtractor::new(&config, keeper).unwrap();
        let err = extractor.extract(&mut grid).await.unwrap_err();

        assert!(matches!(err, Error::Blocked(_)));
        assert_eq!(grid.navigations, 1);
        assert!(matches!(extractor.state(), ExtractionState::Failed(_)));
        let last = grid.screenshots.last().unwrap();
        assert!(last
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("blocked_"));
    }

    #[tokio::test]
    async fn test_access_denied_page_is_blocked() {
        let config = fast_config();
        let mut grid = ScriptedGrid::with_years(&[2023]);
        grid.denial_text = Some("403 Forbidden".to_string());

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let err = extractor.extract(&mut grid).await.unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
        assert_eq!(grid.navigations, 1);
    }

    #[tokio::test]
    async fn test_table_timeouts_stop_after_max_attempts() {
        let config = fast_config();
        let mut grid = ScriptedGrid::with_years(&[2023]);
        grid.table_absent_loads = 10;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let err = extractor.extract(&mut grid).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert_eq!(grid.navigations, 3);
    }

    #[tokio::test]
    async fn test_stalled_page_loads_stop_after_max_attempts() {
        let mut config = fast_config();
        config.browser.page_load_timeout_ms = 20;
        let mut grid = ScriptedGrid::with_years(&[2023]);
        grid.slow_loads = 10;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let err = extractor.extract(&mut grid).await.unwrap_err();

        assert!(matches!(err, Error::Timeout { waited_ms: 20, .. }));
        assert_eq!(grid.navigations, 3);
    }

    #[tokio::test]
    async fn test_stalled_page_load_is_retried() {
        let mut config = fast_config();
        config.browser.page_load_timeout_ms = 20;
        let mut grid = ScriptedGrid::new(&["[BE] Belgium"], &["2023"], &[("row1", &[("2023", "1")])]);
        grid.slow_loads = 2;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(grid.navigations, 3);
        assert_eq!(extraction.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_browser_reported_load_timeout_is_retried() {
        let config = fast_config();
        let mut grid = ScriptedGrid::new(&["[BE] Belgium"], &["2023"], &[("row1", &[("2023", "1")])]);
        grid.load_timeouts = 1;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(grid.navigations, 2);
        assert_eq!(extraction.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_element_handles_are_released_between_sweeps() {
        let config = fast_config();
        let mut grid = virtualized_grid();

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        extractor.extract(&mut grid).await.unwrap();

        assert!(grid.releases > 1);
        assert!(grid.peak_handles < grid.handles_issued());
    }

    #[tokio::test]
    async fn test_table_appearing_on_last_attempt_succeeds() {
        let config = fast_config();
        let mut grid = ScriptedGrid::new(&["[BE] Belgium"], &["2023"], &[("row1", &[("2023", "1")])]);
        grid.table_absent_loads = 2;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(grid.navigations, 3);
        assert_eq!(extraction.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_table_is_not_an_error_here() {
        let config = fast_config();
        let mut grid = ScriptedGrid::with_years(&[2022, 2023]);

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert!(extraction.rows.is_empty());
        assert_eq!(extraction.years, vec![2022, 2023]);
    }

    #[tokio::test]
    async fn test_labels_carry_row_ids_when_present() {
        let config = fast_config();
        let mut grid = ScriptedGrid::new(
            &["[BE] Belgium", "[FR] France"],
            &["2023"],
            &[("row1", &[("2023", "1")]), ("row2", &[("2023", "2")])],
        );
        grid.label_row_ids = true;

        let mut extractor = TableExtractor::new(&config, ScreenshotKeeper::disabled()).unwrap();
        let extraction = extractor.extract(&mut grid).await.unwrap();

        assert_eq!(
            extraction.geo_labels[1],
            GeoLabel {
                row_id: Some("row2".to_string()),
                text: "[FR] France".to_string(),
            }
        );
    }
}
