use crate::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// A blob written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub filename: String,
    pub path: PathBuf,
}

/// Flat directory of uploaded files served under `/uploads/`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!("Upload directory ready: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        let filename = unique_filename(original_name);
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(StoredUpload { filename, path })
    }
}

/// `<base>-<millis>-<random><ext>`, with directories stripped and runs of
/// whitespace or URL-reserved characters replaced by `-`.
pub fn unique_filename(original_name: &str) -> String {
    let (base, ext) = sanitize_filename(original_name);
    let random = Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("{base}-{}-{random}{ext}", Utc::now().timestamp_millis())
}

fn sanitize_filename(original_name: &str) -> (String, String) {
    let name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.chars().all(|c| c == '.') {
        return ("upload".to_string(), String::new());
    }

    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };

    let stem = stem
        .split(|c: char| !is_path_safe(c))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let stem = if stem.is_empty() {
        "upload".to_string()
    } else {
        stem
    };
    let ext: String = ext.chars().filter(|&c| is_path_safe(c)).collect();

    (stem, ext)
}

/// Characters that survive unescaped in an `/uploads/<name>` URL path.
fn is_path_safe(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}
