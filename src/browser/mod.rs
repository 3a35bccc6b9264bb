//! Browser capabilities needed to read a virtualized grid
//!
//! The extractor only talks to a [`GridPage`]: navigate, find elements,
//! read text/attributes, scroll containers and take screenshots. The real
//! implementation drives Chrome over the DevTools protocol; tests use an
//! in-memory scripted grid.

mod chrome;
pub mod detection;
pub mod scroll;

#[cfg(test)]
pub(crate) mod scripted;

pub use chrome::{is_browser_available, ChromeSession};
pub use detection::{Obstacle, ObstacleDetector};
pub use scroll::{plan_horizontal_stops, ScrollOutcome, ViewportScroller};

use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Opaque handle to an element found on the current page.
///
/// Handles are invalidated by the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub(crate) u64);

/// Scroll axis of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Scroll geometry of a container, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollMetrics {
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub scroll_width: f64,
    pub scroll_height: f64,
    pub client_width: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Largest meaningful offset along an axis
    pub fn max_offset(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => (self.scroll_width - self.client_width).max(0.0),
            Axis::Vertical => (self.scroll_height - self.client_height).max(0.0),
        }
    }

    /// Whether the content overflows the viewport along an axis
    pub fn can_scroll(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.scroll_width > self.client_width,
            Axis::Vertical => self.scroll_height > self.client_height,
        }
    }
}

/// A page in a browser session, reduced to what grid extraction needs
#[async_trait]
pub trait GridPage: Send {
    /// Navigate and wait for the load event
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// All elements matching a CSS selector, in document order
    async fn find_all(&mut self, selector: &str) -> Result<Vec<ElementRef>>;

    /// Descendants of `parent` matching a CSS selector
    async fn find_within(&mut self, parent: ElementRef, selector: &str)
        -> Result<Vec<ElementRef>>;

    /// Rendered text of an element
    async fn text(&mut self, element: ElementRef) -> Result<String>;

    async fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>>;

    /// Visible, sized and not disabled
    async fn is_interactable(&mut self, element: ElementRef) -> Result<bool>;

    async fn click(&mut self, element: ElementRef) -> Result<()>;

    /// Scroll geometry of the first element matching `container`, if any
    async fn scroll_metrics(&mut self, container: &str) -> Result<Option<ScrollMetrics>>;

    /// Set a container's scroll offset and fire its `scroll` event
    async fn set_scroll(&mut self, container: &str, axis: Axis, offset: f64) -> Result<()>;

    async fn scroll_into_view(&mut self, element: ElementRef) -> Result<()>;

    /// Serialized DOM of the current page
    async fn page_html(&mut self) -> Result<String>;

    /// Drop every element handle handed out so far
    fn release_elements(&mut self);

    /// Save a PNG screenshot of the page
    async fn screenshot(&mut self, path: &Path) -> Result<()>;

    /// Terminate the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
