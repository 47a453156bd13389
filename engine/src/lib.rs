//! Kisum Engine Library
//!
//! This library provides the core functionality of the Kisum summary
//! generator. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Document ingestion module
pub mod ingest;

/// Chunking, vector index and retrieval question answering
pub mod retrieval;

/// Section orchestration module
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

pub use conductor::{generate_summary, Summary, SummaryOrchestrator};
