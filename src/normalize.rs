//! Cell text normalization
//!
//! Turns the displayed text of one grid cell into a [`CellPayload`]:
//! - `:` (or nothing) means the provider has no value
//! - `(b)`, `(p)`, `(e)` footnote markers, or a trailing bare letter, become a [`Flag`]
//! - thousands spacing is removed and a decimal comma becomes a period
//!
//! Values stay text so the published precision is never rounded.

use crate::models::{CellPayload, Flag};
use regex::Regex;
use std::sync::OnceLock;

/// Sentinel the grid shows for a missing observation
pub const MISSING_MARKER: &str = ":";

fn bracketed_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\(\s*([bpe])\s*\)").expect("valid regex"))
}

fn trailing_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:^|\s)([bpe])\s*$").expect("valid regex"))
}

/// Normalize the displayed text of one cell
pub fn normalize_cell(raw: &str) -> CellPayload {
    let text = raw.trim();
    if text.is_empty() || text == MISSING_MARKER {
        return CellPayload::missing();
    }

    let (flag, rest) = strip_flag(text);
    let rest = rest.trim();
    if rest.is_empty() || rest == MISSING_MARKER {
        return CellPayload::missing();
    }

    let value = clean_number(rest);
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return CellPayload::missing();
    }

    CellPayload {
        value: Some(value),
        flag,
        is_available: true,
    }
}

/// Remove footnote markers, returning the first one found
fn strip_flag(text: &str) -> (Option<Flag>, String) {
    let bracketed = bracketed_marker_re();
    if let Some(caps) = bracketed.captures(text) {
        let flag = caps.get(1).and_then(|m| m.as_str().parse::<Flag>().ok());
        let stripped = bracketed.replace_all(text, " ");
        return (flag, stripped.into_owned());
    }

    let trailing = trailing_marker_re();
    if let Some(caps) = trailing.captures(text) {
        let flag = caps.get(1).and_then(|m| m.as_str().parse::<Flag>().ok());
        let stripped = trailing.replace(text, "");
        return (flag, stripped.into_owned());
    }

    (None, text.to_string())
}

/// Drop grouping characters and settle on a period decimal separator.
///
/// The separator appearing last is taken as the decimal one; a lone comma is
/// always decimal, repeated commas are grouping.
fn clean_number(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');

    match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(_), None) if compact.matches(',').count() == 1 => compact.replace(',', "."),
        (Some(_), None) => compact.replace(',', ""),
        _ => compact,
    }
}
