//! Summary orchestration
//!
//! [`SummaryOrchestrator`] runs every section of a [`SectionPlan`]
//! concurrently against one retrieval handle, then turns the finished
//! sections into the final text:
//!
//! 1. sections are recorded as they complete; failed sections are absent
//! 2. canned fallback text fills every fallback id still absent
//! 3. empty sections are dropped
//! 4. sections are joined with a blank line in ascending id order
//!
//! The output never depends on which section finished first.

use chrono::{DateTime, Utc};
use sdk::collaborator::{Indexer, Retriever, Synthesizer, TextExtractor};
use sdk::errors::EngineError;
use sdk::types::{SectionId, SectionResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::fallback::SectionFallbackPolicy;
use super::plan::SectionPlan;
use super::synthesis::ChatSynthesizer;
use super::worker::SectionWorker;
use crate::config::{Config, PipelineConfig};
use crate::ingest::{document_digest, DocumentExtractor};
use crate::llm::{build_provider, LLMProvider};
use crate::retrieval::EmbeddingIndexer;
use crate::secrets::{scrub_secrets, SecretManager};

/// Separator between sections in the summary text
pub const SECTION_SEPARATOR: &str = "\n\n";

/// Section texts collected during one run
///
/// Filled only by the orchestrator as section tasks are joined. Each id is
/// written at most once.
#[derive(Debug, Default)]
pub struct FinalResponses {
    entries: BTreeMap<SectionId, String>,
}

impl FinalResponses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished section
    ///
    /// Empty text leaves the section absent so a fallback can take its
    /// place. A second insert for the same id is ignored and returns false.
    pub fn insert(&mut self, result: SectionResult) -> bool {
        if SectionFallbackPolicy::is_empty(&result.text) {
            return false;
        }
        if self.entries.contains_key(&result.section) {
            warn!(section = %result.section, "Duplicate section result ignored");
            return false;
        }
        self.entries.insert(result.section, result.text);
        true
    }

    pub fn contains(&self, id: &SectionId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply fallbacks and the empty filter; sections in ascending id order
    pub fn finalize(mut self, policy: &SectionFallbackPolicy) -> Vec<SectionResult> {
        for id in policy.fill_missing(&mut self.entries) {
            info!(section = %id, "Using fallback text");
        }
        for id in SectionFallbackPolicy::remove_empty(&mut self.entries) {
            info!(section = %id, "Dropping empty section");
        }

        self.entries
            .into_iter()
            .map(|(section, text)| SectionResult { section, text })
            .collect()
    }
}

/// Result of one summary run
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Id of the run, also recorded on every log line of the run
    pub run_id: Uuid,
    pub document: PathBuf,
    /// BLAKE3 digest of the extracted document text
    pub digest: String,
    /// Sections in ascending id order
    pub sections: Vec<SectionResult>,
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    /// Sections joined by a blank line
    pub fn text(&self) -> String {
        join_sections(&self.sections)
    }
}

/// Join section texts with [`SECTION_SEPARATOR`]
pub fn join_sections(sections: &[SectionResult]) -> String {
    sections
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Pool sizes, chunking and timeouts of a run
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub chunk_size_tiers: Vec<usize>,
    /// 0 = one worker per section
    pub max_section_workers: usize,
    pub max_subquery_workers: usize,
    pub call_timeout: Duration,
}

impl From<&PipelineConfig> for OrchestratorOptions {
    fn from(pipeline: &PipelineConfig) -> Self {
        Self {
            chunk_size_tiers: pipeline.chunk_size_tiers.clone(),
            max_section_workers: pipeline.max_section_workers,
            max_subquery_workers: pipeline.max_subquery_workers,
            call_timeout: pipeline.call_timeout(),
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Runs a section plan end to end
pub struct SummaryOrchestrator {
    extractor: Arc<dyn TextExtractor>,
    indexer: Arc<dyn Indexer>,
    synthesizer: Arc<dyn Synthesizer>,
    plan: Arc<SectionPlan>,
    options: OrchestratorOptions,
}

impl SummaryOrchestrator {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        indexer: Arc<dyn Indexer>,
        synthesizer: Arc<dyn Synthesizer>,
        plan: Arc<SectionPlan>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            extractor,
            indexer,
            synthesizer,
            plan,
            options,
        }
    }

    /// Wire the shipped collaborators around one provider
    pub fn with_provider(
        provider: Arc<dyn LLMProvider>,
        config: &Config,
        plan: Arc<SectionPlan>,
    ) -> Self {
        Self::new(
            Arc::new(DocumentExtractor::new()),
            Arc::new(EmbeddingIndexer::new(Arc::clone(&provider), &config.pipeline)),
            Arc::new(ChatSynthesizer::new(provider)),
            plan,
            OrchestratorOptions::from(&config.pipeline),
        )
    }

    /// Build from configuration, resolving credentials up front
    ///
    /// # Errors
    /// `EngineError::Config` when the provider cannot be built (e.g. the
    /// OpenAI key is missing). Nothing is read or sent before this check.
    pub fn from_config(
        config: &Config,
        secrets: &SecretManager,
        plan: Arc<SectionPlan>,
    ) -> Result<Self, EngineError> {
        let provider = build_provider(config, secrets)?;
        info!(provider = provider.name(), "Using LLM provider");
        Ok(Self::with_provider(provider, config, plan))
    }

    pub fn plan(&self) -> &SectionPlan {
        &self.plan
    }

    /// Summarize the document at `path`
    ///
    /// # Errors
    /// Ingestion and indexing failures. Section failures only make the
    /// summary shorter.
    pub async fn generate(&self, path: &Path) -> Result<Summary, EngineError> {
        let run_id = Uuid::new_v4();
        self.generate_run(run_id, path)
            .instrument(info_span!("summary", run_id = %run_id))
            .await
    }

    async fn generate_run(&self, run_id: Uuid, path: &Path) -> Result<Summary, EngineError> {
        let start = Instant::now();

        let text = self.extractor.extract_text(path).await?;
        let digest = document_digest(&text);
        info!(digest = %digest, "Document ingested");

        let handle = self
            .indexer
            .build_index(&text, &self.options.chunk_size_tiers)
            .await?;

        let sections = self.summarize(handle).await;

        info!(
            document = %path.display(),
            sections = sections.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summary generated"
        );

        Ok(Summary {
            run_id,
            document: path.to_path_buf(),
            digest,
            sections,
            generated_at: Utc::now(),
        })
    }

    /// Run every section against an existing retrieval handle
    ///
    /// Returns the finalized sections in ascending id order.
    pub async fn summarize(&self, handle: Arc<dyn Retriever>) -> Vec<SectionResult> {
        let worker = SectionWorker::new(
            handle,
            Arc::clone(&self.synthesizer),
            self.plan.persona(),
            self.options.max_subquery_workers,
            self.options.call_timeout,
        );

        let pool_size = match self.options.max_section_workers {
            0 => self.plan.len(),
            cap => cap.min(self.plan.len()),
        };
        let pool = Arc::new(Semaphore::new(pool_size.max(1)));
        let mut tasks = JoinSet::new();

        for entry in self.plan.sections().iter().cloned() {
            let worker = worker.clone();
            let pool = Arc::clone(&pool);

            tasks.spawn(
                async move {
                    let result = match pool.acquire_owned().await {
                        Ok(_permit) => worker.run(&entry).await,
                        Err(_) => Err(EngineError::Synthesis("Section pool closed".into())),
                    };
                    (entry.name, result)
                }
                .in_current_span(),
            );
        }

        let mut responses = FinalResponses::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(result))) => {
                    responses.insert(result);
                }
                Ok((section, Err(e))) => {
                    warn!(
                        section = %section,
                        "Section failed: {}",
                        scrub_secrets(&e.to_string())
                    );
                }
                Err(e) => {
                    warn!("Section task aborted: {}", e);
                }
            }
        }

        responses.finalize(self.plan.fallback_policy())
    }
}

/// Summarize `path` with the configuration in `~/.kisum/config.toml`
///
/// Loads the configuration and section plan, resolves credentials, then
/// returns the summary text.
pub async fn generate_summary(path: &Path) -> Result<String, EngineError> {
    let config = Config::load_or_create()?;
    let plan = Arc::new(SectionPlan::resolve(None, &config.pipeline)?);
    let orchestrator = SummaryOrchestrator::from_config(&config, &SecretManager::default(), plan)?;

    Ok(orchestrator.generate(path).await?.text())
}
