//! Word (.docx) documents
//!
//! A .docx file is a zip archive; the body text lives in `word/document.xml`
//! as `<w:t>` runs grouped into `<w:p>` paragraphs. Each paragraph becomes one
//! line of text; tabs and explicit breaks are kept.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use sdk::collaborator::TextExtractor;
use sdk::errors::EngineError;
use std::io::{Cursor, Read};
use std::path::Path;

use super::{has_extension, read_bytes, unsupported};

const DOCUMENT_XML: &str = "word/document.xml";

/// Reads the body text of Word documents
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for DocxExtractor {
    fn is_supported(&self, path: &Path) -> bool {
        has_extension(path, &["docx"])
    }

    async fn extract_text(&self, path: &Path) -> Result<String, EngineError> {
        if !self.is_supported(path) {
            return Err(unsupported(path));
        }

        let bytes = read_bytes(path).await?;
        let name = path.display().to_string();

        tokio::task::spawn_blocking(move || docx_text(&bytes))
            .await
            .map_err(|e| EngineError::Ingestion(format!("Reading {} aborted: {}", name, e)))?
    }
}

/// Paragraph text of an in-memory .docx archive
pub fn docx_text(bytes: &[u8]) -> Result<String, EngineError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| EngineError::Ingestion(format!("Not a Word document: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| EngineError::Ingestion(format!("Missing {}: {}", DOCUMENT_XML, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| EngineError::Ingestion(format!("Failed to read {}: {}", DOCUMENT_XML, e)))?;

    document_xml_text(&xml)
}

/// Walk `word/document.xml` collecting run text per paragraph
fn document_xml_text(xml: &str) -> Result<String, EngineError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| {
                    EngineError::Ingestion(format!("Malformed text in {}: {}", DOCUMENT_XML, e))
                })?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(EngineError::Ingestion(format!(
                    "Malformed {} at byte {}: {}",
                    DOCUMENT_XML,
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}
