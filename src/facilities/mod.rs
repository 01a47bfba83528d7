//! Per-facility parsing strategies.
//!
//! Each originating report format gets one concrete strategy: filename
//! recognition rules, a header-date pattern, a page-marker pattern, and an
//! ordered row cascade with its own noise vocabulary. The set is closed and
//! known at build time, so the registry is a fixed list rather than anything
//! pluggable.

pub mod kaiser;
pub mod monument;
pub mod rapid_city;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::records::LabRecord;

pub use kaiser::Kaiser;
pub use monument::Monument;
pub use rapid_city::RapidCity;

/// Parsing strategy for one originating report format. Implementations are
/// immutable unit structs; every regex they expose is compiled once and
/// shared read-only across all workers.
pub trait Facility: Send + Sync {
    /// Controlled facility identifier, also written into each record.
    fn name(&self) -> &'static str;

    /// Filename-recognition rules, matched case-insensitively.
    fn filename_rules(&self) -> &[Regex];

    /// Whether documents from this facility are image-based scans.
    fn requires_ocr(&self) -> bool;

    /// Pattern whose `date` capture is the document header date.
    fn header_date_pattern(&self) -> &Regex;

    /// Multiline pattern for the printed page/Bates marker.
    fn page_marker_pattern(&self) -> &Regex;

    /// Raw panel/battery name from a header area, or empty.
    fn extract_panel_name(&self, text: &str) -> String;

    /// Run the row cascade over one page of text.
    fn extract_rows(&self, text: &str, source: &str) -> Vec<LabRecord>;

    fn matches_filename(&self, filename: &str) -> bool {
        self.filename_rules().iter().any(|rule| rule.is_match(filename))
    }

    fn extract_header_date(&self, text: &str) -> String {
        self.header_date_pattern()
            .captures(text)
            .and_then(|caps| caps.name("date"))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    fn extract_page_marker(&self, text: &str) -> String {
        self.page_marker_pattern()
            .find(text)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    }
}

/// The closed set of shipped strategies, in match-precedence order.
pub static FACILITIES: Lazy<Vec<Box<dyn Facility>>> =
    Lazy::new(|| vec![Box::new(RapidCity), Box::new(Kaiser), Box::new(Monument)]);

/// Resolve the strategy responsible for a document filename, if any.
pub fn facility_for_filename(filename: &str) -> Option<&'static dyn Facility> {
    FACILITIES
        .iter()
        .find(|f| f.matches_filename(filename))
        .map(|f| f.as_ref())
}

pub(crate) fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("invalid facility pattern")
}

pub(crate) fn ci_multiline(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .expect("invalid facility pattern")
}

/// Known unit shapes for continuation-line lookahead: mass/volume ratios,
/// percent forms, and a handful of literal lab units. A fixed vocabulary, not
/// a unit grammar.
static UNIT_VOCAB: Lazy<Regex> =
    Lazy::new(|| ci(r"([a-zA-Z]+/[a-zA-Z]+|[a-zA-Z]+%|uIU/mL|mg/dL|g/dL|IU/L|K/uL|M/uL)"));

/// First recognized unit token anywhere on the line, or empty.
pub(crate) fn scan_unit(line: &str) -> String {
    UNIT_VOCAB
        .find(line)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

static LEADING_UNIT: Lazy<Regex> = Lazy::new(|| ci(r"^([a-zA-Z]+/[a-zA-Z]+|[a-zA-Z]+%)"));

/// Unit token only when it opens the line, for formats that print the unit at
/// the start of a continuation line.
pub(crate) fn leading_unit(line: &str) -> String {
    LEADING_UNIT
        .find(line)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([\d.,]+)").expect("invalid pattern"));

/// Bare numeric token at the start of the line, used to repair a reference
/// range split across lines.
pub(crate) fn leading_number(line: &str) -> Option<&str> {
    LEADING_NUMBER.find(line).map(|m| m.as_str())
}
