//! Document-level assembly: runs the active strategy over each page and fills
//! the gaps a single page cannot resolve on its own.
//!
//! Panel fallback order: page-level header, then a document-level header from
//! the concatenated pages, then the panel segment of the filename. A record
//! whose panel is still empty or the generic placeholder takes its own
//! component name instead; a record never ships with a blank panel.
//!
//! Date fallback order: row date, then document header date, then the leading
//! ISO date segment of the filename.

use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

use crate::constants;
use crate::facilities::Facility;
use crate::normalize;
use crate::records::LabRecord;

/// Filenames follow `DATE--PANEL--FACILITY.pdf`.
fn filename_segments(source: &str) -> Vec<&str> {
    Path::new(source)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.split(constants::FILENAME_SEPARATOR).collect())
        .unwrap_or_default()
}

/// Panel label from the middle filename segments, or empty.
fn panel_from_filename(source: &str) -> String {
    let parts = filename_segments(source);
    if parts.len() < 3 {
        return String::new();
    }
    let raw = parts[1..parts.len() - 1]
        .join(constants::FILENAME_SEPARATOR)
        .to_uppercase();
    normalize::normalize_panel(&raw)
}

/// Collection date from the leading ISO filename segment, reformatted to the
/// record convention, or empty.
fn date_from_filename(source: &str) -> String {
    filename_segments(source)
        .first()
        .and_then(|seg| NaiveDate::parse_from_str(seg, "%Y-%m-%d").ok())
        .map(|date| date.format("%m/%d/%Y").to_string())
        .unwrap_or_default()
}

fn is_placeholder_panel(panel: &str) -> bool {
    panel.is_empty() || panel.eq_ignore_ascii_case(constants::PLACEHOLDER_PANEL)
}

/// Extract every record from a document's pages, with document- and
/// filename-level fallbacks applied.
pub fn assemble(facility: &dyn Facility, pages: &[String], source: &str) -> Vec<LabRecord> {
    let full_text = pages.join("\n");

    let mut doc_panel = normalize::normalize_panel(&facility.extract_panel_name(&full_text));
    if doc_panel.is_empty() {
        doc_panel = panel_from_filename(source);
        if !doc_panel.is_empty() {
            debug!(source, panel = %doc_panel, "panel name taken from filename");
        }
    }
    let doc_date = facility.extract_header_date(&full_text);
    let filename_date = date_from_filename(source);

    let mut records = Vec::new();
    for text in pages {
        for mut record in facility.extract_rows(text, source) {
            if record.panel_name.is_empty() {
                record.panel_name = doc_panel.clone();
            }
            if is_placeholder_panel(&record.panel_name) {
                record.panel_name = record.component.clone();
            }
            if record.test_date.is_empty() {
                record.test_date = if doc_date.is_empty() {
                    filename_date.clone()
                } else {
                    doc_date.clone()
                };
            }
            records.push(record);
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facilities::RapidCity;

    #[test]
    fn test_panel_falls_back_to_filename_segment() {
        let pages = vec!["F CA 10.5 8.7-10.6 (mg/dL)\n".to_string()];
        let records = assemble(&RapidCity, &pages, "2025-12-09--CMP--RCB.pdf");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].panel_name, "Comprehensive Metabolic Panel (CMP)");
    }

    #[test]
    fn test_page_level_panel_wins_over_filename() {
        let pages = vec![
            "LIPID PANEL\nNAME VALUE REFERENCE RANGE\nF CA 10.5 8.7-10.6 (mg/dL)\n".to_string(),
        ];
        let records = assemble(&RapidCity, &pages, "2025-12-09--CMP--RCB.pdf");
        assert_eq!(records[0].panel_name, "Lipid Panel");
    }

    #[test]
    fn test_placeholder_panel_is_replaced_by_component() {
        let pages = vec!["F CA 10.5 8.7-10.6 (mg/dL)\n".to_string()];
        let records = assemble(&RapidCity, &pages, "2025-12-09--Visit Labs--RCB.pdf");
        assert_eq!(records[0].panel_name, "Calcium");
    }

    #[test]
    fn test_date_falls_back_to_filename() {
        let pages = vec!["F CA 10.5 8.7-10.6 (mg/dL)\n".to_string()];
        let records = assemble(&RapidCity, &pages, "2025-12-09--CMP--RCB.pdf");
        assert_eq!(records[0].test_date, "12/09/2025");
    }

    #[test]
    fn test_header_date_wins_over_filename() {
        let pages = vec![
            "Collection Date: 01/02/2025 08:12:00\nF CA 10.5 8.7-10.6 (mg/dL)\n".to_string(),
        ];
        let records = assemble(&RapidCity, &pages, "2025-12-09--CMP--RCB.pdf");
        assert_eq!(records[0].test_date, "01/02/2025");
    }

    #[test]
    fn test_header_date_on_first_page_covers_later_pages() {
        let pages = vec![
            "Collection Date: 01/02/2025 08:12:00\n".to_string(),
            "F CA 10.5 8.7-10.6 (mg/dL)\n".to_string(),
        ];
        let records = assemble(&RapidCity, &pages, "2025-12-09--CMP--RCB.pdf");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test_date, "01/02/2025");
    }

    #[test]
    fn test_filename_helpers() {
        assert_eq!(
            panel_from_filename("2025-12-09--CMP--RCB.pdf"),
            "Comprehensive Metabolic Panel (CMP)"
        );
        assert_eq!(panel_from_filename("notes.pdf"), "");
        assert_eq!(date_from_filename("2025-12-09--CMP--RCB.pdf"), "12/09/2025");
        assert_eq!(date_from_filename("CMP--RCB.pdf"), "");
    }
}
