use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

pub const OCTET_STREAM: &str = "application/octet-stream";

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, path: &Path) -> Result<String>;
}

/// Runs the `tesseract` CLI and reads the recognized text from stdout.
pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, path: &Path) -> Result<String> {
        debug!("Running {} on {}", self.command, path.display());

        let output = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::ingestion(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::ingestion(format!("OCR output was not UTF-8: {e}")))
    }
}

/// Declared media type if present, else a guess from the filename.
pub fn detect_media_type(declared: Option<&str>, filename: &str) -> String {
    declared
        .map(str::trim)
        .filter(|declared| !declared.is_empty())
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(filename).first_raw().map(str::to_string))
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Pulls plain text out of an uploaded blob. Never fails: every extraction
/// error is logged and yields an empty string.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    pub async fn extract(&self, path: &Path, bytes: &[u8], media_type: &str) -> String {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let result = if essence == "application/pdf" {
            extract_pdf(bytes.to_vec()).await
        } else if essence.starts_with("text/") {
            decode_utf8(bytes)
        } else if essence.starts_with("image/") {
            self.ocr.recognize(path).await
        } else {
            decode_utf8(bytes)
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Text extraction failed for {}: {}", media_type, e);
                String::new()
            }
        }
    }
}

async fn extract_pdf(bytes: Vec<u8>) -> Result<String> {
    // pdf-extract may panic on malformed input; the join error covers that.
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| Error::ingestion(format!("PDF parser aborted: {e}")))?
        .map_err(|e| Error::ingestion(format!("PDF parse failed: {e}")))
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::ingestion(format!("Content is not valid UTF-8: {e}")))
}
