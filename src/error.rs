use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Page text extraction failed for {file}: {message}")]
    PageText { file: String, message: String },

    #[error("OCR failed for {file}: {detail}")]
    OcrFailed { file: String, detail: String },

    #[error("OCR timed out after {seconds}s for {file}")]
    OcrTimeout { file: String, seconds: u64 },
}

pub type Result<T> = std::result::Result<T, ExtractorError>;
