//! Collaborator traits
//!
//! The summary pipeline only needs four capabilities from the outside world:
//! turning a file into text, indexing that text, answering questions against
//! the index, and free-form synthesis. Each one is a trait here so the engine
//! can ship concrete implementations while tests substitute their own.
//!
//! Every trait is `Send + Sync`: one retriever and one synthesizer are shared
//! by all concurrently running sections of a summary run.

use crate::errors::EngineError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Turns a document on disk into Unicode text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns true if the extractor can handle this file (by extension)
    fn is_supported(&self, path: &Path) -> bool;

    /// Read the document and return its text
    ///
    /// # Errors
    /// `EngineError::UnsupportedDocument` for file types the extractor does
    /// not handle, `EngineError::Ingestion` for unreadable content.
    async fn extract_text(&self, path: &Path) -> Result<String, EngineError>;
}

/// Answers questions against one indexed document
///
/// This is the retrieval handle of a summary run. It must tolerate many
/// concurrent `answer` calls.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Answer a question grounded in the indexed document
    ///
    /// # Errors
    /// `EngineError::Retrieval` when the question cannot be answered.
    async fn answer(&self, question: &str) -> Result<String, EngineError>;
}

/// Builds a retrieval handle from document text
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Chunk the text hierarchically (coarsest tier first) and index it
    ///
    /// # Errors
    /// `EngineError::Indexing` for empty input or embedding failures.
    async fn build_index(
        &self,
        text: &str,
        chunk_size_tiers: &[usize],
    ) -> Result<Arc<dyn Retriever>, EngineError>;
}

/// Free-form, context-grounded text generation
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Produce the answer to `instruction` given `context`
    ///
    /// # Errors
    /// `EngineError::Synthesis` when the model call fails.
    async fn synthesize(
        &self,
        system_prompt: &str,
        context: &str,
        instruction: &str,
    ) -> Result<String, EngineError>;
}
