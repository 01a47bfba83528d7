//! Monument Health reports: image-based PDFs with a method column in the
//! result table.
//!
//! ```text
//! PHOSPHORUS- Final result (08/18/2025 9:19 AM MDT)
//! Component Value Range ...
//! Phosphorus 28 2.5-4.9 SPECTROPHOTOMETRY 08/18/2025 MONUMENT
//! mg/dL AND POTENTIOMETRY 10:34AM HEALTH
//! ```
//!
//! The unit usually lands at the start of the line below the row, mixed into
//! method spillover, so a one-line lookahead pulls it out. An `(ABNORMAL)`
//! marker anywhere on the page flags every row on that page.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ci, ci_multiline, Facility};
use crate::constants;
use crate::normalize;
use crate::records::LabRecord;

static FILENAME_RULES: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![ci(r"--Monument\.pdf$"), ci(r"--MHB\.pdf$")]);

// Final result (08/18/2025 9:19 AM MDT)
static HEADER_DATE: Lazy<Regex> =
    Lazy::new(|| ci(r"Final result\s*\((?P<date>\d{2}/\d{2}/\d{4})"));

// MHB 11, with MBB as a known OCR misread of the same marker
static PAGE_MARKER: Lazy<Regex> = Lazy::new(|| ci_multiline(r"^M[HB]B\s+\d+\s*$"));

// PHOSPHORUS- Final result
static PANEL_HEADER: Lazy<Regex> =
    Lazy::new(|| ci_multiline(r"^([A-Z][A-Z0-9\s,]+?)\s*-\s*Final result"));

// COMPONENT VALUE REF_RANGE METHOD DATE MONUMENT
static ROW_FULL: Lazy<Regex> = Lazy::new(|| {
    ci(r"^(?P<component>[A-Za-z][A-Za-z0-9\s,#%'-]+?)\s+(?P<value>[\d.]+)\s+(?P<ref_range>[\d.-]+(?:\s*-\s*[\d.]+)?)\s+(?P<method>[A-Z][A-Z\s&]+?)\s+(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<location>MONUMENT)")
});

// Same row with OCR garbage where the method column should be.
static ROW_LOOSE: Lazy<Regex> = Lazy::new(|| {
    ci(r"^(?P<component>[A-Za-z][A-Za-z0-9\s,#%'-]+?)\s+(?P<value>[\d.]+)\s+(?P<ref_range>[\d.-]+(?:\s*-\s*[\d.]+)?)\s+.*?(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<location>MONUMENT)")
});

// Unit token at the start of the continuation line: mg/dL, pg/mL, %
static NEXT_LINE_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z/%]+(?:/[a-zA-Z]+)?)(?:\s|$)").expect("invalid facility pattern"));

static SKIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^Ref\s+Analysis",
        r"^Component\s+Value",
        r"^Specimen\s+\(Source\)",
        r"^Anatomical Location",
        r"^Narrative",
        r"^Authorizing Provider",
        r"^Performing Organization",
        r"^Blood\s+Venous",
        r"^Collection Method",
    ]
    .iter()
    .map(|p| ci(p))
    .collect()
});

fn should_skip(line: &str) -> bool {
    SKIP_PATTERNS.iter().any(|p| p.is_match(line))
}

pub struct Monument;

impl Facility for Monument {
    fn name(&self) -> &'static str {
        constants::MONUMENT
    }

    fn filename_rules(&self) -> &[Regex] {
        &FILENAME_RULES
    }

    fn requires_ocr(&self) -> bool {
        true
    }

    fn header_date_pattern(&self) -> &Regex {
        &HEADER_DATE
    }

    fn page_marker_pattern(&self) -> &Regex {
        &PAGE_MARKER
    }

    fn extract_panel_name(&self, text: &str) -> String {
        PANEL_HEADER
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    }

    fn extract_rows(&self, text: &str, source: &str) -> Vec<LabRecord> {
        let header_date = self.extract_header_date(text);
        let page_marker = self.extract_page_marker(text);
        let panel_name = normalize::normalize_panel(&self.extract_panel_name(text));
        let page_flag = if text.to_uppercase().contains("(ABNORMAL)") {
            "A"
        } else {
            ""
        };

        let lines: Vec<&str> = text.lines().collect();
        let mut records = Vec::new();

        for (i, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || should_skip(line) {
                continue;
            }

            let caps = match ROW_FULL.captures(line).or_else(|| ROW_LOOSE.captures(line)) {
                Some(caps) => caps,
                None => continue,
            };

            let unit = lines
                .get(i + 1)
                .and_then(|next| NEXT_LINE_UNIT.captures(next.trim()))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            let row_date = caps["date"].to_string();
            let record = LabRecord {
                source: source.to_string(),
                facility: self.name().to_string(),
                panel_name: panel_name.clone(),
                component: normalize::normalize_component(&caps["component"]),
                test_date: if row_date.is_empty() {
                    header_date.clone()
                } else {
                    row_date
                },
                value: caps["value"].trim().to_string(),
                ref_range: caps["ref_range"].trim().to_string(),
                unit,
                flag: page_flag.to_string(),
                page_marker: page_marker.clone(),
            };
            if record.is_complete() {
                records.push(record);
            }
        }

        records
    }
}
