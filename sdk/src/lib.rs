//! Kisum SDK
//!
//! Shared library providing the error taxonomy, section types, and the
//! collaborator traits of the summary pipeline. The engine implements these
//! traits; tests and alternative front ends can provide their own.

/// Collaborator traits (extraction, indexing, retrieval, synthesis)
pub mod collaborator;

/// Error types and handling
pub mod errors;

/// Section and query result types
pub mod types;

// Re-export commonly used types
pub use collaborator::{Indexer, Retriever, Synthesizer, TextExtractor};
pub use errors::{EngineError, ErrorExt};
pub use types::{QueryResult, SectionId, SectionResult};
