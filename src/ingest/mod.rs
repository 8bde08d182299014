//! Upload handling: store the blob, pull text out of it and ask the text
//! model for an analysis.
//!
//! Extraction and summarization failures never surface to the caller; they
//! degrade to an empty text and a preview-based analysis respectively.

mod extract;
mod storage;

pub use extract::{OCTET_STREAM, OcrEngine, TesseractOcr, TextExtractor, detect_media_type};
pub use storage::{StoredUpload, UploadStore, unique_filename};

use crate::{
    Error, Result,
    llm::{CompletionRequest, LlmClient},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of extracted text sent to the summarizer.
pub const SUMMARY_INPUT_CHARS: usize = 8000;
/// Characters of extracted text returned to the caller.
pub const EXTRACTED_PREVIEW_CHARS: usize = 2000;
/// Characters of extracted text quoted in the fallback analysis.
pub const FALLBACK_PREVIEW_CHARS: usize = 1000;

pub const ANALYSIS_FALLBACK_PREFIX: &str =
    "I couldn't analyze the file with AI at the moment, but here's the extracted content preview:\n\n";

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub declared_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub filename: String,
    #[serde(rename = "originalname")]
    pub original_name: String,
    #[serde(rename = "mimetype")]
    pub media_type: String,
    pub size: usize,
    pub url: String,
    pub extracted_text: String,
    pub analysis: String,
}

pub struct Ingestor {
    uploads: UploadStore,
    extractor: TextExtractor,
    llm_client: Arc<dyn LlmClient>,
    max_upload_bytes: usize,
}

impl Ingestor {
    pub fn new(
        uploads: UploadStore,
        extractor: TextExtractor,
        llm_client: Arc<dyn LlmClient>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            uploads,
            extractor,
            llm_client,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Stores and analyzes an upload; `base_url` prefixes the returned `/uploads/` URL.
    pub async fn ingest(&self, upload: Upload, base_url: &str) -> Result<IngestReport> {
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(Error::validation("File too large"));
        }

        let media_type = detect_media_type(upload.declared_type.as_deref(), &upload.original_name);
        let stored = self
            .uploads
            .save(&upload.original_name, &upload.bytes)
            .await?;
        let url = format!(
            "{}/uploads/{}",
            base_url.trim_end_matches('/'),
            stored.filename
        );

        let extracted = self
            .extractor
            .extract(&stored.path, &upload.bytes, &media_type)
            .await;
        info!(
            filename = %stored.filename,
            media_type = %media_type,
            size_bytes = upload.bytes.len(),
            extracted_chars = extracted.chars().count(),
            "stored upload"
        );

        let analysis = self
            .analyze(&upload.original_name, &media_type, upload.bytes.len(), &extracted)
            .await;

        Ok(IngestReport {
            filename: stored.filename,
            original_name: upload.original_name,
            media_type,
            size: upload.bytes.len(),
            url,
            extracted_text: truncate_chars(&extracted, EXTRACTED_PREVIEW_CHARS).to_string(),
            analysis,
        })
    }

    async fn analyze(&self, original_name: &str, media_type: &str, size: usize, extracted: &str) -> String {
        let prompt = format!(
            "You are an assistant that analyzes uploaded files. Summarize and extract key insights, and suggest next actions.\n\n\
             Filename: {original_name}\nMIME: {media_type}\nSize: {size} bytes\n\n\
             Extracted content (raw):\n{}",
            truncate_chars(extracted, SUMMARY_INPUT_CHARS)
        );

        match self.llm_client.complete(CompletionRequest::new(prompt)).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!("File analysis failed, returning preview: {}", e);
                fallback_analysis(extracted)
            }
        }
    }
}

pub fn fallback_analysis(extracted: &str) -> String {
    let preview = truncate_chars(extracted, FALLBACK_PREVIEW_CHARS);
    let preview = if preview.is_empty() { "<no text>" } else { preview };
    format!("{ANALYSIS_FALLBACK_PREFIX}{preview}")
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
