//! Batch output sinks: the CSV of extracted records, a missed-files report
//! for triage, and a machine-readable run summary.

use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::pipeline::{BatchOutcome, FailureKind};
use crate::records::LabRecord;

/// Write all records to `lab_results.csv` under `dir`, one row per record,
/// with a header row.
pub fn write_csv(dir: &Path, records: &[LabRecord]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("lab_results.csv");

    let mut writer = csv::Writer::from_path(&path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "wrote results CSV");
    Ok(path)
}

fn failure_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Ocr => "ocr failed",
        FailureKind::Extraction => "extraction error",
        FailureKind::NoRows => "no results extracted",
    }
}

/// Write the missed-files report listing unrecognized documents and
/// per-document failures. Nothing is written when the batch was clean.
pub fn write_missed_report(dir: &Path, outcome: &BatchOutcome) -> Result<Option<PathBuf>> {
    if outcome.unrecognized.is_empty() && outcome.failures.is_empty() {
        return Ok(None);
    }

    fs::create_dir_all(dir)?;
    let path = dir.join("missed_files.txt");
    let mut file = fs::File::create(&path)?;

    writeln!(file, "Missed Files Report - {}", Local::now().to_rfc3339())?;
    writeln!(file, "{}", "=".repeat(60))?;
    writeln!(file)?;
    for name in &outcome.unrecognized {
        writeln!(file, "- {name}: unrecognized facility pattern")?;
    }
    for failure in &outcome.failures {
        writeln!(
            file,
            "- {}: {} ({})",
            failure.source,
            failure_label(failure.kind),
            failure.detail
        )?;
    }

    info!(path = %path.display(), "wrote missed-files report");
    Ok(Some(path))
}

#[derive(Serialize)]
struct BatchSummary<'a> {
    completed_at: String,
    processed: usize,
    skipped: usize,
    errors: usize,
    records: usize,
    unrecognized: &'a [String],
}

/// Write the run summary as JSON for downstream tooling.
pub fn write_summary_json(dir: &Path, outcome: &BatchOutcome) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join("run_summary.json");

    let summary = BatchSummary {
        completed_at: Local::now().to_rfc3339(),
        processed: outcome.processed_count(),
        skipped: outcome.skipped_count(),
        errors: outcome.error_count(),
        records: outcome.records.len(),
        unrecognized: &outcome.unrecognized,
    };
    fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DocumentFailure;

    fn sample_record() -> LabRecord {
        LabRecord {
            source: "2025-12-09--CMP--RCB.pdf".to_string(),
            facility: "RCMC".to_string(),
            panel_name: "Comprehensive Metabolic Panel (CMP)".to_string(),
            component: "Calcium".to_string(),
            test_date: "12/09/2025".to_string(),
            value: "10.5".to_string(),
            ref_range: "8.7-10.6".to_string(),
            unit: "mg/dL".to_string(),
            flag: String::new(),
            page_marker: "RCB 45".to_string(),
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), &[sample_record()]).unwrap();
        let content = fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "source,facility,panel_name,component,test_date,value,ref_range,unit,flag,page_marker"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Calcium"));
        assert!(row.contains("10.5"));
    }

    #[test]
    fn test_missed_report_skipped_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BatchOutcome::default();
        assert!(write_missed_report(dir.path(), &outcome).unwrap().is_none());
    }

    #[test]
    fn test_missed_report_lists_unrecognized_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BatchOutcome {
            unrecognized: vec!["mystery.pdf".to_string()],
            failures: vec![DocumentFailure {
                source: "2025-01-01--CMP--RCB.pdf".to_string(),
                kind: FailureKind::NoRows,
                detail: "no results extracted".to_string(),
            }],
            ..BatchOutcome::default()
        };
        let path = write_missed_report(dir.path(), &outcome).unwrap().unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("mystery.pdf: unrecognized facility pattern"));
        assert!(content.contains("2025-01-01--CMP--RCB.pdf: no results extracted"));
    }

    #[test]
    fn test_summary_json_counts() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BatchOutcome {
            records: vec![sample_record()],
            processed: vec!["2025-12-09--CMP--RCB.pdf".to_string()],
            ..BatchOutcome::default()
        };
        let path = write_summary_json(dir.path(), &outcome).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["processed"], 1);
        assert_eq!(parsed["records"], 1);
        assert_eq!(parsed["errors"], 0);
    }
}
