//! Geo and year key resolution
//!
//! Ties the frozen-column labels (`[CODE] Description`) to the harvested body
//! rows and turns each pair into a persistable [`GeoRecord`].

use crate::error::{Error, Result};
use crate::models::{
    Extraction, GeoAreaRecord, GeoLabel, GeoRecord, ObservationRecord, RawExtractionRow,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Lowest header value accepted as a year column
pub const MIN_PLAUSIBLE_YEAR: i32 = 2000;
/// Highest header value accepted as a year column
pub const MAX_PLAUSIBLE_YEAR: i32 = 2035;

/// Note stored for Kosovo, whose label carries a footnote asterisk
pub const KOSOVO_NOTE: &str = "UNSCR 1244/1999";

/// Parse a header or column id as a year key.
///
/// Only purely numeric text inside the plausible range is accepted.
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<i32>()
        .ok()
        .filter(|y| (MIN_PLAUSIBLE_YEAR..=MAX_PLAUSIBLE_YEAR).contains(y))
}

/// Split a `[CODE] Description` label on its first bracket pair
pub fn parse_geo_label(text: &str) -> Option<(String, String)> {
    let open = text.find('[')?;
    let close = open + text[open..].find(']')?;

    let code = clean_code(&text[open + 1..close]);
    if code.is_empty() {
        return None;
    }

    let after = text[close + 1..].trim();
    let description = if after.is_empty() {
        text[..open].trim()
    } else {
        after
    };
    let description = if description.is_empty() {
        code.clone()
    } else {
        description.to_string()
    };

    Some((code, description))
}

/// Strip footnote decorations from a bracketed code
fn clean_code(raw: &str) -> String {
    let mut code = raw.trim();
    loop {
        let before = code;
        code = code.trim_end_matches('*').trim();
        if let Some(idx) = code.rfind('(') {
            if code.ends_with(')') && code.len() - idx <= 4 {
                code = code[..idx].trim();
            }
        }
        if code == before {
            break;
        }
    }
    code.to_uppercase()
}

/// Build the geo area attributes from a code and its description.
///
/// Flags are a pure function of the description.
pub fn classify(code: &str, description: &str) -> GeoAreaRecord {
    let is_kosovo = description.contains("Kosovo");
    let notes = if description.contains("Kosovo*") || description.contains("1244") {
        Some(KOSOVO_NOTE.to_string())
    } else {
        None
    };

    GeoAreaRecord {
        code: code.to_string(),
        name: description.to_string(),
        is_eu: description.contains("European Union"),
        is_euro_area: description.contains("Euro area"),
        is_kosovo,
        notes,
    }
}

/// Result of joining labels and rows
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub records: Vec<GeoRecord>,
    /// Labels that carried no usable code
    pub skipped_labels: Vec<String>,
    /// Rows kept as geo areas but without any available year
    pub rows_without_data: usize,
}

/// Join labels to rows and build the records to persist.
///
/// Labels are matched to rows by row id when every label has a distinct id
/// present in the body; otherwise by rendered position. A count mismatch
/// aborts the whole import.
pub fn resolve(extraction: &Extraction) -> Result<Resolution> {
    let labels = &extraction.geo_labels;
    if labels.len() != extraction.rows.len() {
        return Err(Error::Alignment {
            labels: labels.len(),
            rows: extraction.rows.len(),
        });
    }

    let pairs = pair_labels_with_rows(labels, extraction);
    let mut resolution = Resolution::default();

    for (label, row) in pairs {
        let Some((code, description)) = parse_geo_label(&label.text) else {
            warn!(
                "Skipping row {}: label {:?} has no bracketed code",
                row.row_id, label.text
            );
            resolution.skipped_labels.push(label.text.clone());
            continue;
        };

        let area = classify(&code, &description);
        let observations = if row.available_years() == 0 {
            debug!("Row {} ({}) has no available years", row.row_id, code);
            resolution.rows_without_data += 1;
            Vec::new()
        } else {
            row.cells
                .iter()
                .map(|(year, cell)| ObservationRecord {
                    year: *year,
                    value: cell.value.clone(),
                    flag: cell.flag,
                    is_available: cell.is_available,
                })
                .collect()
        };

        resolution.records.push(GeoRecord { area, observations });
    }

    Ok(resolution)
}

fn pair_labels_with_rows<'a>(
    labels: &'a [GeoLabel],
    extraction: &'a Extraction,
) -> Vec<(&'a GeoLabel, &'a RawExtractionRow)> {
    let ids: Vec<&str> = labels.iter().filter_map(|l| l.row_id.as_deref()).collect();
    let distinct: HashSet<&str> = ids.iter().copied().collect();
    let by_id = ids.len() == labels.len()
        && distinct.len() == labels.len()
        && ids.iter().all(|id| extraction.rows.contains_key(*id));

    if by_id {
        debug!("Joining {} labels to rows by row id", labels.len());
        labels
            .iter()
            .filter_map(|l| {
                let id = l.row_id.as_deref()?;
                extraction.rows.get(id).map(|row| (l, row))
            })
            .collect()
    } else {
        debug!("Joining {} labels to rows by position", labels.len());
        labels.iter().zip(extraction.rows.values()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_cell;

    fn label(row_id: Option<&str>, text: &str) -> GeoLabel {
        GeoLabel {
            row_id: row_id.map(str::to_string),
            text: text.to_string(),
        }
    }

    fn row(id: &str, cells: &[(i32, &str)]) -> RawExtractionRow {
        let mut row = RawExtractionRow::new(id);
        for (year, raw) in cells {
            row.cells.insert(*year, normalize_cell(raw));
        }
        row
    }

    fn extraction(labels: Vec<GeoLabel>, rows: Vec<RawExtractionRow>) -> Extraction {
        Extraction {
            geo_labels: labels,
            rows: rows.into_iter().map(|r| (r.row_id.clone(), r)).collect(),
            years: vec![2023],
        }
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year(" 2000 "), Some(2000));
        assert_eq!(parse_year("2035"), Some(2035));
        assert_eq!(parse_year("1999"), None);
        assert_eq!(parse_year("2036"), None);
        assert_eq!(parse_year("2023Q1"), None);
        assert_eq!(parse_year("geo"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_parse_geo_label_variants() {
        assert_eq!(
            parse_geo_label("[BE] Belgium"),
            Some(("BE".to_string(), "Belgium".to_string()))
        );
        assert_eq!(
            parse_geo_label("[EU27_2020] European Union - 27 countries (from 2020)"),
            Some((
                "EU27_2020".to_string(),
                "European Union - 27 countries (from 2020)".to_string()
            ))
        );
        assert_eq!(
            parse_geo_label("  [xk*] Kosovo*  "),
            Some(("XK".to_string(), "Kosovo*".to_string()))
        );
        assert_eq!(
            parse_geo_label("[DE (b)] Germany"),
            Some(("DE".to_string(), "Germany".to_string()))
        );
        assert_eq!(
            parse_geo_label("Malta [MT]"),
            Some(("MT".to_string(), "Malta".to_string()))
        );
        assert_eq!(parse_geo_label("Belgium"), None);
        assert_eq!(parse_geo_label("[] Nowhere"), None);
    }

    #[test]
    fn test_classification() {
        let eu = classify("EU27_2020", "European Union - 27 countries (from 2020)");
        assert!(eu.is_eu);
        assert!(!eu.is_euro_area);
        assert!(!eu.is_kosovo);
        assert_eq!(eu.notes, None);

        let xk = classify("XK", "Kosovo*");
        assert!(xk.is_kosovo);
        assert_eq!(xk.notes.as_deref(), Some(KOSOVO_NOTE));

        let ea = classify("EA20", "Euro area – 20 countries (from 2023)");
        assert!(ea.is_euro_area);
        assert!(!ea.is_eu);
    }

    #[test]
    fn test_alignment_mismatch_is_fatal() {
        let labels = (0..5)
            .map(|i| label(None, &format!("[C{}] Country {}", i, i)))
            .collect();
        let rows = (0..4)
            .map(|i| row(&format!("row{}", i), &[(2023, "1,0")]))
            .collect();

        match resolve(&extraction(labels, rows)) {
            Err(Error::Alignment { labels, rows }) => {
                assert_eq!(labels, 5);
                assert_eq!(rows, 4);
            }
            other => panic!("expected alignment error, got {:?}", other),
        }
    }

    #[test]
    fn test_rows_without_data_keep_the_area() {
        let labels = vec![label(None, "[BE] Belgium"), label(None, "[FR] France")];
        let rows = vec![
            row("row1", &[(2023, "100,5")]),
            row("row2", &[(2023, ":")]),
        ];

        let resolution = resolve(&extraction(labels, rows)).unwrap();
        assert_eq!(resolution.records.len(), 2);
        assert_eq!(resolution.rows_without_data, 1);

        let be = &resolution.records[0];
        assert_eq!(be.area.code, "BE");
        assert_eq!(be.area.name, "Belgium");
        assert_eq!(
            be.observations,
            vec![ObservationRecord {
                year: 2023,
                value: Some("100.5".to_string()),
                flag: None,
                is_available: true,
            }]
        );

        let fr = &resolution.records[1];
        assert_eq!(fr.area.code, "FR");
        assert!(fr.observations.is_empty());
    }

    #[test]
    fn test_unavailable_years_persist_when_row_has_data() {
        let labels = vec![label(None, "[AT] Austria")];
        let rows = vec![row("0", &[(2022, ":"), (2023, "477 082,1 (p)")])];

        let resolution = resolve(&extraction(labels, rows)).unwrap();
        let obs = &resolution.records[0].observations;
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].year, 2022);
        assert!(!obs[0].is_available);
        assert_eq!(obs[0].value, None);
        assert_eq!(obs[1].value.as_deref(), Some("477082.1"));
    }

    #[test]
    fn test_join_prefers_row_ids_over_position() {
        let labels = vec![
            label(Some("r2"), "[FR] France"),
            label(Some("r1"), "[BE] Belgium"),
        ];
        let rows = vec![
            row("r1", &[(2023, "1,0")]),
            row("r2", &[(2023, "2,0")]),
        ];

        let resolution = resolve(&extraction(labels, rows)).unwrap();
        let fr = &resolution.records[0];
        assert_eq!(fr.area.code, "FR");
        assert_eq!(fr.observations[0].value.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_unparseable_label_is_skipped_not_fatal() {
        let labels = vec![label(None, "Belgium"), label(None, "[FR] France")];
        let rows = vec![
            row("row1", &[(2023, "1,0")]),
            row("row2", &[(2023, "2,0")]),
        ];

        let resolution = resolve(&extraction(labels, rows)).unwrap();
        assert_eq!(resolution.records.len(), 1);
        assert_eq!(resolution.skipped_labels, vec!["Belgium".to_string()]);
    }
}
