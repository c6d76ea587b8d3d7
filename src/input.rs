//! Input collection: free text or a single PDF/TXT document encoded for
//! inline transmission.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::{IntelligenceError, Result};
use crate::models::{AnalysisInput, DocumentMime, InlineDocument};

#[derive(Debug, Clone)]
pub struct InputCollector {
    max_upload_bytes: u64,
}

impl InputCollector {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        Self::new(cfg.max_upload_bytes)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Free-text input. Surrounding whitespace is dropped; `None` when
    /// nothing is left.
    pub fn text(raw: &str) -> Option<AnalysisInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(AnalysisInput::Text(trimmed.to_string()))
        }
    }

    /// Read a document from disk and base64-encode it. The MIME type comes
    /// from the file extension.
    pub async fn load_document(&self, path: &Path) -> Result<InlineDocument> {
        let shown = path.display().to_string();

        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentMime::from_extension)
            .ok_or_else(|| {
                IntelligenceError::file_read(&shown, "only .pdf and .txt files are supported")
            })?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| IntelligenceError::file_read(&shown, e))?;
        if !metadata.is_file() {
            return Err(IntelligenceError::file_read(&shown, "not a regular file"));
        }
        self.check_size(&shown, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IntelligenceError::file_read(&shown, e))?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let mut doc = self.document_from_bytes(&shown, &bytes, mime_type)?;
        doc.file_name = file_name;
        tracing::info!(
            path = shown.as_str(),
            mime = %mime_type,
            bytes = bytes.len(),
            "Document loaded"
        );
        Ok(doc)
    }

    /// Encode bytes the host already holds. `origin` names them in errors.
    pub fn document_from_bytes(
        &self,
        origin: &str,
        bytes: &[u8],
        mime_type: DocumentMime,
    ) -> Result<InlineDocument> {
        if bytes.is_empty() {
            return Err(IntelligenceError::file_read(origin, "file is empty"));
        }
        self.check_size(origin, bytes.len() as u64)?;

        Ok(InlineDocument {
            data: STANDARD.encode(bytes),
            mime_type,
            file_name: None,
        })
    }

    fn check_size(&self, origin: &str, len: u64) -> Result<()> {
        if len > self.max_upload_bytes {
            return Err(IntelligenceError::file_read(
                origin,
                format!(
                    "file is {} bytes, the limit is {} bytes",
                    len, self.max_upload_bytes
                ),
            ));
        }
        Ok(())
    }
}

impl Default for InputCollector {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
