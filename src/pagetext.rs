//! Page text acquisition from PDF documents.
//!
//! Extraction itself is delegated to the `pdftotext` tool from poppler, which
//! emits one form-feed-separated block per page. The provider sits behind a
//! trait so the pipeline can run against canned text in tests.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{ExtractorError, Result};

/// Minimum trimmed characters on an early page for a document to count as
/// having a usable text layer.
const TEXT_LAYER_THRESHOLD: usize = 50;

/// Number of leading pages probed when deciding whether to OCR.
const TEXT_LAYER_PROBE_PAGES: usize = 2;

/// Source of per-page text for a document. Calls are blocking; the pipeline
/// moves them onto the blocking pool.
pub trait PageTextProvider: Send + Sync {
    /// All pages of the document, in order.
    fn page_texts(&self, path: &Path) -> Result<Vec<String>>;

    /// Whether the document already carries a text layer worth parsing.
    /// Probes only the first pages, so it stays cheap on large scans.
    fn has_extractable_text(&self, path: &Path) -> Result<bool> {
        let pages = self.page_texts(path)?;
        Ok(pages
            .iter()
            .take(TEXT_LAYER_PROBE_PAGES)
            .any(|page| page.trim().len() > TEXT_LAYER_THRESHOLD))
    }
}

/// `pdftotext -layout` wrapper. Layout mode preserves the column spacing the
/// row patterns depend on.
pub struct PdfTextTool;

impl PdfTextTool {
    pub fn is_available() -> bool {
        Self::probe("pdftotext")
    }

    fn probe(command: &str) -> bool {
        Command::new(command)
            .arg("-v")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

impl PageTextProvider for PdfTextTool {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>> {
        let file = path.display().to_string();
        debug!(file = %file, "extracting page text");

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| ExtractorError::PageText {
                file: file.clone(),
                message: format!("failed to launch pdftotext: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::PageText {
                file,
                message: stderr.trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        // pdftotext separates pages with a form feed and ends with one.
        let mut pages: Vec<String> = text.split('\u{c}').map(str::to_string).collect();
        if pages.last().is_some_and(|last| last.trim().is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedText(HashMap<String, Vec<String>>);

    impl PageTextProvider for FixedText {
        fn page_texts(&self, path: &Path) -> Result<Vec<String>> {
            Ok(self
                .0
                .get(&path.display().to_string())
                .cloned()
                .unwrap_or_default())
        }
    }

    #[test]
    fn test_availability_probe_requires_clean_exit() {
        // A command that spawns but exits nonzero is not available.
        assert!(!PdfTextTool::probe("false"));
        assert!(!PdfTextTool::probe("nonexistent-pdf-tool"));
        assert!(PdfTextTool::probe("true"));
    }

    #[test]
    fn test_text_layer_probe_accepts_real_text() {
        let long_page = "X".repeat(TEXT_LAYER_THRESHOLD + 1);
        let provider = FixedText(HashMap::from([(
            "doc.pdf".to_string(),
            vec![long_page, String::new()],
        )]));
        assert!(provider.has_extractable_text(Path::new("doc.pdf")).unwrap());
    }

    #[test]
    fn test_text_layer_probe_rejects_near_empty_pages() {
        let provider = FixedText(HashMap::from([(
            "doc.pdf".to_string(),
            vec!["  \n ".to_string(), "short".to_string()],
        )]));
        assert!(!provider.has_extractable_text(Path::new("doc.pdf")).unwrap());
    }

    #[test]
    fn test_text_layer_probe_ignores_later_pages() {
        let long_page = "X".repeat(TEXT_LAYER_THRESHOLD + 1);
        let provider = FixedText(HashMap::from([(
            "doc.pdf".to_string(),
            vec![String::new(), String::new(), long_page],
        )]));
        assert!(!provider.has_extractable_text(Path::new("doc.pdf")).unwrap());
    }
}
