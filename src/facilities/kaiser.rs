//! Kaiser reports: image-based PDFs that arrive through OCR with a noisy
//! multi-line layout.
//!
//! ```text
//! LIPID PANEL (LIPID PANEL (CHOL, TRIG, DHDL, CALC LDL)) - Final result (08/06/2021 5:16 PM EDT)
//! Component Value Range ...
//! CHOLESTEROL 195 0-199 08/06/2021 KAISER
//! TSH 2.03 0.35 - 02/07/2022 GA
//! 4.94 uIU/mL
//! ```
//!
//! OCR breaks reference ranges and units across lines, so this strategy walks
//! a line cursor and repairs partial ranges with a one-line lookahead. The
//! cursor always advances by exactly one line; lookahead never moves it.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::{ci, ci_multiline, leading_number, leading_unit, scan_unit, Facility};
use crate::constants;
use crate::normalize;
use crate::records::LabRecord;

static FILENAME_RULES: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![ci(r"--Kaiser\.pdf$"), ci(r"--KPA\.pdf$")]);

// Final result (08/06/2021 5:16 PM EDT)
static HEADER_DATE: Lazy<Regex> =
    Lazy::new(|| ci(r"Final result\s*\((?P<date>\d{2}/\d{2}/\d{4})"));

// KPA 45
static PAGE_MARKER: Lazy<Regex> = Lazy::new(|| ci_multiline(r"^KPA\s+\d+\s*$"));

// Panel name before a parenthetical, with "- Final result" possibly pushed to
// a later line by an OCR break.
static PANEL_SPANNING: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^([A-Z][A-Z0-9\s,]+?)\s*[(\n].*?-\s*Final result")
        .case_insensitive(true)
        .multi_line(true)
        .dot_matches_new_line(true)
        .build()
        .expect("invalid facility pattern")
});

// Looser fallback: panel name directly before "- Final result" on one line.
static PANEL_DIRECT: Lazy<Regex> =
    Lazy::new(|| ci_multiline(r"^([A-Z][A-Z0-9\s,]+?)\s*-\s*Final result"));

// Loosest fallback: the leading uppercase run of the first line.
static PANEL_LEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][A-Z0-9 ,]+?)(?:\s*\(|\s*$)").expect("invalid facility pattern"));

// Row cascade, most complete shape first.
// CHOLESTEROL 195 0-199 08/06/2021 KAISER
static ROW_FULL: Lazy<Regex> = Lazy::new(|| {
    ci(r"^(?P<component>[A-Z][A-Z0-9\s,'#%-]+?)\s+(?P<value>[<>]*[\d.,]+)\s+(?P<ref_range>[\d.,]+\s*-\s*[\d.,]+)\s+(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<location>[A-Z0-9\s]+)")
});

// Partial range whose end fell onto the next line.
// TSH 2.03 0.35 - 02/07/2022 GA
static ROW_PARTIAL: Lazy<Regex> = Lazy::new(|| {
    ci(r"^(?P<component>[A-Z][A-Z0-9\s,'#%-]+?)\s+(?P<value>[<>]*[\d.,]+)\s+(?P<ref_start>[\d.,]+)\s*-\s*(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<location>[A-Z0-9\s]+)")
});

// No range on the line at all, maybe an inline unit.
static ROW_SIMPLE: Lazy<Regex> = Lazy::new(|| {
    ci(r"^(?P<component>[A-Z][A-Z0-9\s,'#%-]+?)\s+(?P<value>[<>]*[\d.,]+)\s+(?:(?P<unit>[a-zA-Z/%\d]+)\s+)?(?P<date>\d{2}/\d{2}/\d{4})\s+(?P<location>[A-Z0-9\s]+)")
});

// Urinalysis dipstick key-value rows: GLU: NEG
static ROW_KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<component>[A-Z]+):\s+(?P<value>[A-Z0-9]+)\s*$").expect("invalid facility pattern"));

// Comments, interpretive blocks, column headers, and bare range lines.
static SKIP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^Comment:",
        r"^Interpretive Data",
        r"^<\d+\s+mg/dL",
        r"^\d+\s*-\s*\d+\s+mg/dL",
        r"^>\d+\s+mg/dL",
        r"^Ref\s+Analysis",
        r"^Component\s+Value",
        r"^Specimen\s+\(Source\)",
        r"^Anatomical Location",
        r"^Narrative",
        r"^Authorizing Provider",
        r"^Performing Organization",
        r"^SERUM",
        r"^PLASMA",
        r"^Blood",
        r"^\d{2}/\d{2}/\d{4}",
    ]
    .iter()
    .map(|p| ci(p))
    .collect()
});

fn should_skip(line: &str) -> bool {
    if line.len() < 5 {
        return true;
    }
    SKIP_PATTERNS.iter().any(|p| p.is_match(line))
}

pub struct Kaiser;

impl Facility for Kaiser {
    fn name(&self) -> &'static str {
        constants::KAISER
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
        if let Some(caps) = PANEL_SPANNING.captures(text) {
            return caps[1].trim().to_string();
        }
        if let Some(caps) = PANEL_DIRECT.captures(text) {
            return caps[1].trim().to_string();
        }
        // Accept a bare leading uppercase run only when the page really is a
        // result header, not a stray component line.
        if let Some(first_line) = text.lines().next() {
            if let Some(caps) = PANEL_LEADING.captures(first_line) {
                // OCR text is not ASCII; back the cut off to a char boundary.
                let mut head_end = text.len().min(500);
                while !text.is_char_boundary(head_end) {
                    head_end -= 1;
                }
                if text[..head_end].contains("Final result") {
                    return caps[1].trim().to_string();
                }
            }
        }
        String::new()
    }

    fn extract_rows(&self, text: &str, source: &str) -> Vec<LabRecord> {
        let header_date = self.extract_header_date(text);
        let page_marker = self.extract_page_marker(text);
        let panel_name = normalize::normalize_panel(&self.extract_panel_name(text));

        let lines: Vec<&str> = text.lines().collect();
        let mut records = Vec::new();

        for (i, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || should_skip(line) {
                continue;
            }

            let mut component = String::new();
            let mut value = String::new();
            let mut ref_range = String::new();
            let mut unit = String::new();
            let mut row_date = String::new();

            if let Some(caps) = ROW_FULL.captures(line) {
                component = caps["component"].to_string();
                value = caps["value"].to_string();
                ref_range = caps["ref_range"].to_string();
                row_date = caps["date"].to_string();
            } else if let Some(caps) = ROW_PARTIAL.captures(line) {
                component = caps["component"].to_string();
                value = caps["value"].to_string();
                row_date = caps["date"].to_string();
                let ref_start = &caps["ref_start"];
                // The range end usually opens the next line after the OCR
                // break; a dangling start is kept rather than discarded.
                match lines.get(i + 1).map(|l| l.trim()).and_then(|next| {
                    leading_number(next).map(|end| (end.to_string(), scan_unit(next)))
                }) {
                    Some((end, next_unit)) => {
                        ref_range = format!("{ref_start}-{end}");
                        unit = next_unit;
                    }
                    None => ref_range = format!("{ref_start}-"),
                }
            } else if let Some(caps) = ROW_SIMPLE.captures(line) {
                component = caps["component"].to_string();
                value = caps["value"].to_string();
                row_date = caps["date"].to_string();
                if let Some(m) = caps.name("unit") {
                    unit = m.as_str().to_string();
                }
            } else if let Some(caps) = ROW_KEY_VALUE.captures(line) {
                component = caps["component"].to_string();
                value = caps["value"].to_string();
                row_date = header_date.clone();
            } else {
                continue;
            }

            if unit.is_empty() {
                if let Some(next) = lines.get(i + 1) {
                    unit = leading_unit(next.trim());
                }
            }

            let record = LabRecord {
                source: source.to_string(),
                facility: self.name().to_string(),
                panel_name: panel_name.clone(),
                // " TES" is a recurring OCR artifact glued onto component names
                component: normalize::normalize_component(&component.replace(" TES", "")),
                test_date: if row_date.is_empty() {
                    header_date.clone()
                } else {
                    row_date
                },
                value: value.trim().to_string(),
                ref_range: ref_range.trim().to_string(),
                unit,
                flag: String::new(),
                page_marker: page_marker.clone(),
            };
            if record.is_complete() {
                records.push(record);
            }
        }

        records
    }
}
