//! OCR pass for image-based documents, run through `ocrmypdf`.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::error::{ExtractorError, Result};

/// Wrapper around the external OCR command. One invocation produces a new PDF
/// with a text layer; the original file is never touched.
pub struct OcrEngine {
    command: String,
    timeout: Duration,
}

impl OcrEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Probe the OCR command once at startup so a missing install surfaces as
    /// one warning instead of a failure per scanned document.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// OCR `input` into `output`. The child is killed if the per-document
    /// timeout elapses.
    pub async fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let file = input.display().to_string();
        debug!(file = %file, "running OCR");

        let child = Command::new(&self.command)
            .arg("--force-ocr")
            .arg("--jobs")
            .arg("1")
            .arg(input)
            .arg(output)
            .kill_on_drop(true)
            .output();

        let out = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| ExtractorError::OcrFailed {
                file: file.clone(),
                detail: format!("failed to launch {}: {e}", self.command),
            })?,
            Err(_) => {
                warn!(file = %file, seconds = self.timeout.as_secs(), "OCR timed out");
                return Err(ExtractorError::OcrTimeout {
                    file,
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ExtractorError::OcrFailed {
                file,
                detail: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
