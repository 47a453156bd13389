//! Document ingestion
//!
//! [`DocumentExtractor`] picks a reader by file extension:
//! - `.txt`, `.text`, `.md`, `.markdown`: UTF-8 text
//! - `.docx`: Word body text, one line per paragraph
//! - `.pdf`: the PDF text layer

pub mod docx;
pub mod pdf;
pub mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

use async_trait::async_trait;
use sdk::collaborator::TextExtractor;
use sdk::errors::EngineError;
use std::path::Path;

/// Extracts text from every supported document type
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor {
    text: PlainTextExtractor,
    docx: DocxExtractor,
    pdf: PdfExtractor,
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn reader_for(&self, path: &Path) -> Option<&dyn TextExtractor> {
        if self.text.is_supported(path) {
            Some(&self.text)
        } else if self.docx.is_supported(path) {
            Some(&self.docx)
        } else if self.pdf.is_supported(path) {
            Some(&self.pdf)
        } else {
            None
        }
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    fn is_supported(&self, path: &Path) -> bool {
        self.reader_for(path).is_some()
    }

    async fn extract_text(&self, path: &Path) -> Result<String, EngineError> {
        let reader = self.reader_for(path).ok_or_else(|| unsupported(path))?;
        let text = reader.extract_text(path).await?;

        tracing::info!(
            document = %path.display(),
            chars = text.chars().count(),
            "Document text extracted"
        );

        Ok(text)
    }
}

/// Hex BLAKE3 digest of extracted document text
pub fn document_digest(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Case-insensitive extension match
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

pub(crate) fn unsupported(path: &Path) -> EngineError {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| "(no extension)".to_string());
    EngineError::UnsupportedDocument(ext)
}

pub(crate) async fn read_bytes(path: &Path) -> Result<Vec<u8>, EngineError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| EngineError::Ingestion(format!("Failed to read {}: {}", path.display(), e)))
}
