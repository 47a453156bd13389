//! Conductor System
//!
//! Orchestrates the section plan: concurrent section workers, context
//! assembly, synthesis, normalization and the fallback policy.

pub mod context;
pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod plan;
pub mod synthesis;
pub mod worker;

pub use fallback::SectionFallbackPolicy;
pub use normalizer::normalize;
pub use orchestrator::{
    generate_summary, FinalResponses, OrchestratorOptions, Summary, SummaryOrchestrator,
};
pub use plan::{SectionEntry, SectionPlan};
pub use synthesis::ChatSynthesizer;
pub use worker::SectionWorker;
