use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Runtime configuration, read from `config.toml` when present. Every field
/// has a working default so the binary runs without any config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// External OCR command, invoked once per image-based document
    pub command: String,
    /// Hard per-document OCR timeout
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for the CSV, the missed-files report, and the JSON summary
    pub dir: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "ocrmypdf".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
