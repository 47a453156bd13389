//! UTF-8 text and Markdown documents

use async_trait::async_trait;
use sdk::collaborator::TextExtractor;
use sdk::errors::EngineError;
use std::path::Path;

use super::{has_extension, unsupported};

/// Extensions accepted by [`PlainTextExtractor`], lowercase
pub const TEXT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

/// Reads UTF-8 text and Markdown documents
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn is_supported(&self, path: &Path) -> bool {
        has_extension(path, &TEXT_EXTENSIONS)
    }

    async fn extract_text(&self, path: &Path) -> Result<String, EngineError> {
        if !self.is_supported(path) {
            return Err(unsupported(path));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            EngineError::Ingestion(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let text = String::from_utf8(bytes).map_err(|e| {
            EngineError::Ingestion(format!(
                "{} is not valid UTF-8 (byte {})",
                path.display(),
                e.utf8_error().valid_up_to()
            ))
        })?;

        // Strip a leading byte order mark
        Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
    }
}
