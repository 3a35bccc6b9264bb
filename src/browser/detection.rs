//! Bot-challenge and access-denial detection
//!
//! Runs once per page load on a snapshot of the rendered HTML:
//! - challenge widgets are matched by CSS selector (captcha checkbox/iframes,
//!   challenge forms)
//! - denial pages are matched by body text markers, case-insensitively,
//!   looking only at text a visitor would see

use super::GridPage;
use crate::config::ObstacleConfig;
use crate::error::{Error, Result};
use scraper::node::Element;
use scraper::{Html, Node, Selector};
use tracing::{debug, warn};

/// Something on the page that prevents extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Obstacle {
    /// A bot-challenge widget matched this selector
    Challenge { selector: String },
    /// The body text contains this denial marker
    AccessDenied { marker: String },
}

impl std::fmt::Display for Obstacle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Obstacle::Challenge { selector } => write!(f, "challenge widget ({})", selector),
            Obstacle::AccessDenied { marker } => write!(f, "access denied (\"{}\")", marker),
        }
    }
}

/// Inspects page snapshots for obstacles
#[derive(Debug)]
pub struct ObstacleDetector {
    challenges: Vec<(String, Selector)>,
    markers: Vec<String>,
}

impl ObstacleDetector {
    pub fn new(config: &ObstacleConfig) -> Result<Self> {
        let challenges = config
            .challenge_selectors
            .iter()
            .map(|raw| {
                Selector::parse(raw)
                    .map(|sel| (raw.clone(), sel))
                    .map_err(|e| {
                        Error::Config(format!("Invalid challenge selector {:?}: {}", raw, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let markers = config
            .denial_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Ok(Self {
            challenges,
            markers,
        })
    }

    /// Look for an obstacle in a page snapshot
    pub fn inspect_html(&self, html: &str) -> Option<Obstacle> {
        let document = Html::parse_document(html);

        for (raw, selector) in &self.challenges {
            if document.select(selector).next().is_some() {
                return Some(Obstacle::Challenge {
                    selector: raw.clone(),
                });
            }
        }

        let body_text = visible_body_text(&document).to_lowercase();

        self.markers
            .iter()
            .find(|marker| body_text.contains(marker.as_str()))
            .map(|marker| Obstacle::AccessDenied {
                marker: marker.clone(),
            })
    }

    /// Check the current page, failing with [`Error::Blocked`] if obstructed
    pub async fn check<P: GridPage + ?Sized>(&self, page: &mut P) -> Result<()> {
        let html = page.page_html().await?;
        match self.inspect_html(&html) {
            Some(obstacle) => {
                warn!("Page is blocked: {}", obstacle);
                Err(Error::Blocked(obstacle.to_string()))
            }
            None => {
                debug!("No obstacles detected ({} bytes inspected)", html.len());
                Ok(())
            }
        }
    }
}

/// Elements whose text never renders
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

fn is_hidden(element: &Element) -> bool {
    if HIDDEN_ELEMENTS.contains(&element.name()) || element.attr("hidden").is_some() {
        return true;
    }
    if element.attr("aria-hidden") == Some("true") {
        return true;
    }
    element.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

/// Body text outside scripts, styles and inline-hidden subtrees
fn visible_body_text(document: &Html) -> String {
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body).next() else {
        return String::new();
    };

    let mut parts = Vec::new();
    for node in body.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(|a| a.value().as_element())
            .any(is_hidden);
        if !hidden {
            parts.push(&**text);
        }
    }
    parts.join(" ")
}
