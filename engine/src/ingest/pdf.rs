//! PDF documents

use async_trait::async_trait;
use sdk::collaborator::TextExtractor;
use sdk::errors::EngineError;
use std::path::Path;

use super::{has_extension, read_bytes, unsupported};

/// Reads the text layer of PDF documents
///
/// Scanned PDFs without a text layer yield empty text, which indexing then
/// rejects.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    fn is_supported(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    async fn extract_text(&self, path: &Path) -> Result<String, EngineError> {
        if !self.is_supported(path) {
            return Err(unsupported(path));
        }

        let bytes = read_bytes(path).await?;
        let name = path.display().to_string();

        // The parser is CPU bound and panics on some malformed files
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| EngineError::Ingestion(format!("Reading {} aborted: {}", name, e)))?
            .map_err(|e| EngineError::Ingestion(format!("Failed to read PDF text: {}", e)))
    }
}
