//! Rapid City Medical Center reports: native-text PDFs with a tabular
//! NAME/VALUE layout.
//!
//! ```text
//! CMP (Complete Metabolic Panel)
//! NAME VALUE REFERENCE RANGE
//! F CA 10.5 8.7-10.6 (mg/dL)
//! F RBC 4.09 L 4.20-5.40 (M/uL)
//! F Calcium, Urine 4.4 Not Estab. (mg/dL)
//! ```
//!
//! This strategy matches spans over the whole page rather than walking a line
//! cursor: each pattern is applied in precedence order and the start offset of
//! every consumed match is recorded, so a looser pattern further down the
//! cascade can never re-emit a row already claimed by a stricter one.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::{ci, ci_multiline, Facility};
use crate::constants;
use crate::normalize;
use crate::records::LabRecord;

static FILENAME_RULES: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![ci(r"--RCMC\.pdf$"), ci(r"--RCB\.pdf$")]);

// Collection Date: 12/09/2025 08:12:00
static HEADER_DATE: Lazy<Regex> =
    Lazy::new(|| ci(r"Collection Date:\s*(?P<date>\d{2}/\d{2}/\d{4})"));

// RCB 45
static PAGE_MARKER: Lazy<Regex> = Lazy::new(|| ci_multiline(r"^RCB\s+\d+\s*$"));

// Panel header is the line immediately above the NAME VALUE column header.
static PANEL_HEADER: Lazy<Regex> =
    Lazy::new(|| ci_multiline(r"^([A-Z][A-Za-z0-9\s,()]+?)(?:\n|\r\n?)NAME\s+VALUE"));

// Most common shape: value, optional flag, reference range, unit in parens.
// F IONIZED CALCIUM 1.43 HH 1.12-1.32 (mmol/L)
// Component classes allow only horizontal whitespace: span matching runs over
// the whole page, and a component that could cross a newline would let a
// match start on the line above a row and swallow it.
static ROW_WITH_RANGE: Lazy<Regex> = Lazy::new(|| {
    ci_multiline(
        r"^(?:F[ \t]+)?(?P<component>[A-Za-z][A-Za-z0-9+#%, \t-]+?)\s+(?P<value>[\d.,<>]+)\s*(?P<flag>[HL]+)?\s+(?P<ref_range>[^(\n]+?)\s*\((?P<unit>[^)]+)\)",
    )
});

// Range but no unit: F RATIO 1.7 0.0-6.7
static ROW_RANGE_NO_UNIT: Lazy<Regex> = Lazy::new(|| {
    ci_multiline(
        r"^(?:F[ \t]+)?(?P<component>[A-Za-z][A-Za-z0-9+#%, \t-]+?)\s+(?P<value>[\d.,<>]+)\s*(?P<flag>[HL]+)?\s+(?P<ref_range>[\d.<>-]+(?:-[0-9.]+)?)\s*$",
    )
});

// Unit but no range: F EAG 89 (mg/dL)
static ROW_NO_RANGE: Lazy<Regex> = Lazy::new(|| {
    ci_multiline(
        r"^(?:F[ \t]+)?(?P<component>[A-Za-z][A-Za-z0-9+#%, \t-]+?)\s+(?P<value>[\d.,<>]+)\s*\((?P<unit>[^)]+)\)",
    )
});

// Loose unit with no parens: F URINE CULTURE 50,000 CFU/ml
static ROW_LOOSE_UNIT: Lazy<Regex> = Lazy::new(|| {
    ci_multiline(
        r"^(?:F[ \t]+)?(?P<component>[A-Za-z][A-Za-z0-9+#%, \t-]+?)\s+(?P<value>[\d.,<>]+)\s+(?P<unit>[^\s()]+)",
    )
});

pub struct RapidCity;

impl RapidCity {
    fn push_matches(
        pattern: &Regex,
        text: &str,
        claimed: &mut HashSet<usize>,
        rows: &mut Vec<(usize, RowCapture)>,
        with_range: bool,
        with_unit: bool,
        with_flag: bool,
    ) {
        for caps in pattern.captures_iter(text) {
            let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
            if !claimed.insert(offset) {
                continue;
            }
            rows.push((
                offset,
                RowCapture {
                    component: caps["component"].to_string(),
                    value: caps["value"].to_string(),
                    ref_range: if with_range {
                        caps["ref_range"].trim().to_string()
                    } else {
                        String::new()
                    },
                    unit: if with_unit {
                        caps["unit"].trim().to_string()
                    } else {
                        String::new()
                    },
                    flag: if with_flag {
                        caps.name("flag").map(|m| m.as_str().to_string()).unwrap_or_default()
                    } else {
                        String::new()
                    },
                },
            ));
        }
    }
}

struct RowCapture {
    component: String,
    value: String,
    ref_range: String,
    unit: String,
    flag: String,
}

impl Facility for RapidCity {
    fn name(&self) -> &'static str {
        constants::RAPID_CITY
    }

    fn filename_rules(&self) -> &[Regex] {
        &FILENAME_RULES
    }

    fn requires_ocr(&self) -> bool {
        false
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
        let test_date = self.extract_header_date(text);
        let page_marker = self.extract_page_marker(text);
        let panel_name = normalize::normalize_panel(&self.extract_panel_name(text));

        let mut claimed = HashSet::new();
        let mut rows: Vec<(usize, RowCapture)> = Vec::new();

        Self::push_matches(&ROW_WITH_RANGE, text, &mut claimed, &mut rows, true, true, true);
        Self::push_matches(&ROW_RANGE_NO_UNIT, text, &mut claimed, &mut rows, true, false, true);
        Self::push_matches(&ROW_NO_RANGE, text, &mut claimed, &mut rows, false, true, false);
        Self::push_matches(&ROW_LOOSE_UNIT, text, &mut claimed, &mut rows, false, true, false);

        // Span matching emits in pattern precedence order; re-sort by offset
        // so records come out in line order.
        rows.sort_by_key(|(offset, _)| *offset);

        rows.into_iter()
            .map(|(_, row)| LabRecord {
                source: source.to_string(),
                facility: self.name().to_string(),
                panel_name: panel_name.clone(),
                component: normalize::normalize_component(&row.component),
                test_date: test_date.clone(),
                value: row.value.trim().to_string(),
                ref_range: row.ref_range,
                unit: row.unit,
                flag: row.flag,
                page_marker: page_marker.clone(),
            })
            .filter(LabRecord::is_complete)
            .collect()
    }
}
