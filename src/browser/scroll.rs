//! Viewport scrolling for the virtualized grid
//!
//! The grid only renders cells inside its scroll window and gives no signal
//! when re-rendering is done, so every move is followed by a fixed settle.

use super::{Axis, ElementRef, GridPage, ScrollMetrics};
use crate::config::{ExtractConfig, ScrollStrategy, SelectorConfig};
use crate::error::Result;
use std::time::Duration;
use tracing::{debug, warn};

/// What a scroll request did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollOutcome {
    /// The container moved to this offset
    Moved(f64),
    /// Content fits the viewport along the axis
    NothingToScroll,
    /// No element matched the container selector
    ContainerMissing,
}

/// Moves the grid's horizontal and vertical scroll containers
#[derive(Debug, Clone)]
pub struct ViewportScroller {
    horizontal: String,
    vertical: String,
    settle: Duration,
}

impl ViewportScroller {
    pub fn new(
        horizontal: impl Into<String>,
        vertical: impl Into<String>,
        settle: Duration,
    ) -> Self {
        Self {
            horizontal: horizontal.into(),
            vertical: vertical.into(),
            settle,
        }
    }

    pub fn from_config(selectors: &SelectorConfig, extract: &ExtractConfig) -> Self {
        Self::new(
            &selectors.horizontal_scroll,
            &selectors.vertical_scroll,
            extract.settle(),
        )
    }

    fn container(&self, axis: Axis) -> &str {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }

    /// Current geometry of the container for an axis
    pub async fn metrics<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        axis: Axis,
    ) -> Result<Option<ScrollMetrics>> {
        page.scroll_metrics(self.container(axis)).await
    }

    /// Move to an absolute offset, clamped to the scrollable range
    pub async fn scroll_to_offset<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        axis: Axis,
        offset: f64,
    ) -> Result<ScrollOutcome> {
        let container = self.container(axis);
        let Some(metrics) = page.scroll_metrics(container).await? else {
            warn!("Scroll container {} not found", container);
            return Ok(ScrollOutcome::ContainerMissing);
        };

        if !metrics.can_scroll(axis) {
            debug!(
                "Nothing to scroll in {} ({:?}): content {} fits viewport {}",
                container,
                axis,
                match axis {
                    Axis::Horizontal => metrics.scroll_width,
                    Axis::Vertical => metrics.scroll_height,
                },
                match axis {
                    Axis::Horizontal => metrics.client_width,
                    Axis::Vertical => metrics.client_height,
                }
            );
            return Ok(ScrollOutcome::NothingToScroll);
        }

        let target = offset.clamp(0.0, metrics.max_offset(axis));
        page.set_scroll(container, axis, target).await?;
        self.settle().await;
        debug!("Scrolled {} ({:?}) to {:.0}", container, axis, target);
        Ok(ScrollOutcome::Moved(target))
    }

    /// Move to a fraction of the scrollable range
    pub async fn scroll_to_fraction<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        fraction: f64,
    ) -> Result<ScrollOutcome> {
        let axis = Axis::Horizontal;
        let Some(metrics) = page.scroll_metrics(self.container(axis)).await? else {
            warn!("Scroll container {} not found", self.container(axis));
            return Ok(ScrollOutcome::ContainerMissing);
        };
        let target = metrics.max_offset(axis) * fraction.clamp(0.0, 1.0);
        self.scroll_to_offset(page, axis, target).await
    }

    pub async fn scroll_to_start<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
    ) -> Result<ScrollOutcome> {
        self.scroll_to_offset(page, Axis::Horizontal, 0.0).await
    }

    pub async fn scroll_to_end<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<ScrollOutcome> {
        self.scroll_to_offset(page, Axis::Horizontal, f64::MAX).await
    }

    pub async fn scroll_to_top<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<ScrollOutcome> {
        self.scroll_to_offset(page, Axis::Vertical, 0.0).await
    }

    pub async fn scroll_to_bottom<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
    ) -> Result<ScrollOutcome> {
        self.scroll_to_offset(page, Axis::Vertical, f64::MAX).await
    }

    /// Bring a row into the vertical window and let the grid render around it
    pub async fn scroll_element_into_view<P: GridPage + ?Sized>(
        &self,
        page: &mut P,
        element: ElementRef,
    ) -> Result<()> {
        page.scroll_into_view(element).await?;
        self.settle().await;
        Ok(())
    }

    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }
}

/// Horizontal offsets to visit so every column is rendered at least once.
///
/// Always starts at 0 and ends at the maximum offset. Returns `[0.0]` when
/// there is nothing to scroll.
pub fn plan_horizontal_stops(
    metrics: &ScrollMetrics,
    strategy: ScrollStrategy,
    step_fraction: f64,
    max_stops: usize,
) -> Vec<f64> {
    let max = metrics.max_offset(Axis::Horizontal);
    if max <= 0.0 {
        return vec![0.0];
    }

    let mut stops = match strategy {
        ScrollStrategy::ThreeStop => vec![0.0, max / 3.0, max],
        ScrollStrategy::Incremental => {
            let step = (metrics.client_width * step_fraction).max(1.0);
            let needed = (max / step).ceil() as usize + 1;
            let max_stops = max_stops.max(2);

            if needed > max_stops {
                let gap = max / (max_stops - 1) as f64;
                (0..max_stops).map(|i| (gap * i as f64).min(max)).collect()
            } else {
                let mut stops: Vec<f64> = (0..needed)
                    .map(|i| (step * i as f64).min(max))
                    .collect();
                if stops.last().copied() != Some(max) {
                    stops.push(max);
                }
                stops
            }
        }
    };

    stops.dedup_by(|a, b| (*a - *b).abs() < 0.5);
    stops
}
