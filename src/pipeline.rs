//! Batch pipeline: fans documents out over a bounded worker pool and folds
//! per-document outcomes into one batch result.
//!
//! Failure isolation is the core contract here. A document that cannot be
//! OCRed, read, or matched produces one recorded failure and nothing else;
//! it never aborts the batch or disturbs other documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::assembler;
use crate::error::Result;
use crate::facilities::{self, Facility};
use crate::ocr::OcrEngine;
use crate::pagetext::PageTextProvider;
use crate::records::LabRecord;

/// How a single document failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The external OCR call failed or timed out.
    Ocr,
    /// The page-text provider or pattern engine faulted.
    Extraction,
    /// The document was read cleanly but the cascade matched zero rows.
    NoRows,
}

#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub source: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// Aggregated result of one batch run.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<LabRecord>,
    pub processed: Vec<String>,
    pub unrecognized: Vec<String>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchOutcome {
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.unrecognized.len()
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }
}

/// Recursively collect every PDF under `input`, sorted for deterministic
/// batch order.
pub fn find_documents(input: &Path) -> Result<Vec<PathBuf>> {
    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, found)?;
            } else if path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            {
                found.push(path);
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    walk(input, &mut found)?;
    found.sort();
    Ok(found)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct ExtractionPipeline {
    provider: Arc<dyn PageTextProvider>,
    ocr: Arc<OcrEngine>,
    workers: usize,
}

impl ExtractionPipeline {
    pub fn new(provider: Arc<dyn PageTextProvider>, ocr: Arc<OcrEngine>, workers: usize) -> Self {
        Self {
            provider,
            ocr,
            workers: workers.max(1),
        }
    }

    /// Run the batch. Documents matching no strategy are reported up front;
    /// the rest are processed concurrently under the worker limit.
    pub async fn run(&self, documents: Vec<PathBuf>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        let mut recognized: Vec<(PathBuf, &'static dyn Facility)> = Vec::new();
        for path in documents {
            let name = file_name(&path);
            match facilities::facility_for_filename(&name) {
                Some(facility) => recognized.push((path, facility)),
                None => {
                    warn!(file = %name, "unrecognized facility pattern");
                    outcome.unrecognized.push(name);
                }
            }
        }

        info!(
            documents = recognized.len(),
            unrecognized = outcome.unrecognized.len(),
            workers = self.workers,
            "starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (path, facility) in recognized {
            let provider = Arc::clone(&self.provider);
            let ocr = Arc::clone(&self.ocr);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // Closing the semaphore is never done here, so acquire only
                // fails if the permit count is zero, which new() prevents.
                let _permit = semaphore.acquire().await;
                process_document(provider, ocr, facility, &path).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((source, records))) => {
                    counter!("documents_processed_total").increment(1);
                    histogram!("document_record_count").record(records.len() as f64);
                    outcome.processed.push(source);
                    outcome.records.extend(records);
                }
                Ok(Err(failure)) => {
                    counter!("documents_failed_total").increment(1);
                    outcome.failures.push(failure);
                }
                Err(join_err) => {
                    error!(error = %join_err, "worker task panicked");
                    counter!("documents_failed_total").increment(1);
                    outcome.failures.push(DocumentFailure {
                        source: "<unknown>".to_string(),
                        kind: FailureKind::Extraction,
                        detail: join_err.to_string(),
                    });
                }
            }
        }

        info!(
            processed = outcome.processed_count(),
            failed = outcome.error_count(),
            records = outcome.records.len(),
            "batch complete"
        );
        outcome
    }
}

/// Process one document end to end: OCR decision, page text, assembly.
async fn process_document(
    provider: Arc<dyn PageTextProvider>,
    ocr: Arc<OcrEngine>,
    facility: &'static dyn Facility,
    path: &Path,
) -> std::result::Result<(String, Vec<LabRecord>), DocumentFailure> {
    let source = file_name(path);
    debug!(file = %source, facility = facility.name(), "processing document");

    // OCR output goes to per-document scratch space that is dropped with the
    // TempDir, whether or not the document succeeds.
    let mut scratch = None;
    let mut read_path = path.to_path_buf();

    if facility.requires_ocr() {
        let probe_provider = Arc::clone(&provider);
        let probe_path = read_path.clone();
        let has_text = tokio::task::spawn_blocking(move || {
            probe_provider.has_extractable_text(&probe_path)
        })
        .await
        .map_err(|e| DocumentFailure {
            source: source.clone(),
            kind: FailureKind::Extraction,
            detail: e.to_string(),
        })?
        .map_err(|e| DocumentFailure {
            source: source.clone(),
            kind: FailureKind::Extraction,
            detail: e.to_string(),
        })?;

        if has_text {
            debug!(file = %source, "text layer present, skipping OCR");
        } else {
            let dir = tempfile::tempdir().map_err(|e| DocumentFailure {
                source: source.clone(),
                kind: FailureKind::Ocr,
                detail: e.to_string(),
            })?;
            let ocr_output = dir.path().join("ocr.pdf");
            ocr.run(path, &ocr_output)
                .await
                .map_err(|e| DocumentFailure {
                    source: source.clone(),
                    kind: FailureKind::Ocr,
                    detail: e.to_string(),
                })?;
            read_path = ocr_output;
            scratch = Some(dir);
        }
    }

    let text_provider = Arc::clone(&provider);
    let text_path = read_path.clone();
    let pages = tokio::task::spawn_blocking(move || text_provider.page_texts(&text_path))
        .await
        .map_err(|e| DocumentFailure {
            source: source.clone(),
            kind: FailureKind::Extraction,
            detail: e.to_string(),
        })?
        .map_err(|e| DocumentFailure {
            source: source.clone(),
            kind: FailureKind::Extraction,
            detail: e.to_string(),
        })?;

    let records = assembler::assemble(facility, &pages, &source);
    drop(scratch);

    if records.is_empty() {
        return Err(DocumentFailure {
            source,
            kind: FailureKind::NoRows,
            detail: "no results extracted".to_string(),
        });
    }

    debug!(file = %source, records = records.len(), "document done");
    Ok((source, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrConfig;
    use crate::error::Result;
    use std::collections::HashMap;

    struct StubProvider {
        pages: HashMap<String, Vec<String>>,
    }

    impl StubProvider {
        fn new(pages: &[(&str, &[&str])]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(name, texts)| {
                        (
                            name.to_string(),
                            texts.iter().map(|t| t.to_string()).collect(),
                        )
                    })
                    .collect(),
            })
        }
    }

    impl PageTextProvider for StubProvider {
        fn page_texts(&self, path: &Path) -> Result<Vec<String>> {
            Ok(self.pages.get(&file_name(path)).cloned().unwrap_or_default())
        }
    }

    fn test_ocr() -> Arc<OcrEngine> {
        // Never invoked in these tests; stub pages always carry a text layer.
        Arc::new(OcrEngine::new(&OcrConfig {
            command: "nonexistent-ocr-tool".to_string(),
            timeout_seconds: 5,
        }))
    }

    #[tokio::test]
    async fn test_recognized_document_produces_records() {
        let page = format!(
            "LIPID PANEL - Final result (08/06/2021 5:16 PM EDT){}\nCHOLESTEROL 195 0-199 08/06/2021 KAISER\nKPA 12\n",
            " ".repeat(60)
        );
        let provider = StubProvider::new(&[("2021-08-06--LIPID PANEL--KPA.pdf", &[&page])]);
        let pipeline = ExtractionPipeline::new(provider, test_ocr(), 2);
        let outcome = pipeline
            .run(vec![PathBuf::from("2021-08-06--LIPID PANEL--KPA.pdf")])
            .await;

        assert_eq!(outcome.processed_count(), 1);
        assert_eq!(outcome.error_count(), 0);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].component, "Total Cholesterol");
        assert_eq!(outcome.records[0].value, "195");
    }

    #[tokio::test]
    async fn test_unrecognized_document_is_reported_not_processed() {
        let provider = StubProvider::new(&[]);
        let pipeline = ExtractionPipeline::new(provider, test_ocr(), 2);
        let outcome = pipeline
            .run(vec![PathBuf::from("2025-01-01--CBC--ELSEWHERE.pdf")])
            .await;

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped_count(), 1);
        assert_eq!(outcome.unrecognized[0], "2025-01-01--CBC--ELSEWHERE.pdf");
        assert_eq!(outcome.error_count(), 0);
    }

    #[tokio::test]
    async fn test_document_with_no_matching_rows_fails_distinctly() {
        let page = format!("Nothing resembling a lab row here.{}", " ".repeat(60));
        let provider = StubProvider::new(&[("2025-01-01--CMP--RCB.pdf", &[&page])]);
        let pipeline = ExtractionPipeline::new(provider, test_ocr(), 2);
        let outcome = pipeline
            .run(vec![PathBuf::from("2025-01-01--CMP--RCB.pdf")])
            .await;

        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.failures[0].kind, FailureKind::NoRows);
        assert_eq!(outcome.failures[0].source, "2025-01-01--CMP--RCB.pdf");
        assert!(outcome.records.is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_disturb_other_documents() {
        let good = "F CA 10.5 8.7-10.6 (mg/dL)\n";
        let provider = StubProvider::new(&[
            ("2025-01-01--CMP--RCB.pdf", &[good]),
            ("2025-01-02--CMP--RCB.pdf", &[]),
        ]);
        let pipeline = ExtractionPipeline::new(provider, test_ocr(), 4);
        let outcome = pipeline
            .run(vec![
                PathBuf::from("2025-01-01--CMP--RCB.pdf"),
                PathBuf::from("2025-01-02--CMP--RCB.pdf"),
            ])
            .await;

        assert_eq!(outcome.processed_count(), 1);
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_find_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(nested.join("c.pdf"), b"x").unwrap();

        let found = find_documents(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| file_name(p)).collect();
        assert_eq!(found.len(), 3);
        assert!(names.contains(&"a.PDF".to_string()));
        assert!(names.contains(&"c.pdf".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }
}
