//! Error types and handling
//!
//! This module provides the error taxonomy shared by the engine and every
//! collaborator implementation. All errors implement the `ErrorExt` trait
//! which provides user-friendly hints and indicates whether the pipeline can
//! degrade around them instead of aborting.
//!
//! # Propagation
//!
//! - `Config`, `Ingestion`, `Indexing` and `UnsupportedDocument` are fatal to
//!   a summary run and reach the caller.
//! - `Retrieval` is recovered per sub-query (the answer is left out of the
//!   section context).
//! - `Synthesis` is recovered per section (the section is absent before
//!   fallback injection).
//! - `Timeout` is treated like the failure of whichever call timed out.
//!
//! # Security
//!
//! Hints are static strings: they never contain API keys, document text or
//! file paths.

use std::time::Duration;
use thiserror::Error;

/// Trait for error extensions
///
/// Provides additional context for errors, including a user-friendly hint
/// and recoverability information.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the summary run can continue with degraded output
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::Retrieval("index unavailable".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Indexing("document is empty".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors (missing credentials, invalid config or plan)
    #[error("Configuration error: {0}")]
    Config(String),

    // Document errors
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("Indexing error: {0}")]
    Indexing(String),

    // Pipeline call errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => {
                "Check your config.toml, section plan, and provider credentials (OPENAI_API_KEY)"
            }

            Self::Ingestion(_) => "The document could not be read. Check that the file is intact and not password protected",
            Self::UnsupportedDocument(_) => {
                "Unsupported file type. Use .txt, .md, .docx or .pdf"
            }
            Self::Indexing(_) => {
                "The document could not be indexed. Check that it is not empty and the embedding provider is reachable"
            }

            Self::Retrieval(_) => "A retrieval question failed. The summary may be incomplete",
            Self::Synthesis(_) => "A section could not be written. The summary may be incomplete",
            Self::Timeout(_) => "The LLM provider took too long to respond. Try again",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Retrieval(_) | Self::Synthesis(_) | Self::Timeout(_) => true,

            Self::Config(_)
            | Self::Ingestion(_)
            | Self::UnsupportedDocument(_)
            | Self::Indexing(_)
            | Self::KeyringError(_)
            | Self::Io(_) => false,
        }
    }
}
