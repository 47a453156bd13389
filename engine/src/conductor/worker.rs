//! Section worker
//!
//! Runs one section of the plan:
//!
//! 1. answers every context-gathering question concurrently on a bounded
//!    pool private to the section
//! 2. assembles the surviving answers in plan order
//! 3. calls the synthesizer exactly once, after every question has resolved
//! 4. normalizes the synthesized text
//!
//! A failed or timed-out question is logged and left out of the context.
//! A failed synthesis fails the section.

use sdk::collaborator::{Retriever, Synthesizer};
use sdk::errors::EngineError;
use sdk::types::{QueryResult, SectionId, SectionResult};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};

use super::context::assemble_context;
use super::normalizer::normalize;
use super::plan::SectionEntry;
use crate::secrets::scrub_secrets;

/// Await `fut`, turning an elapsed deadline into `EngineError::Timeout`
pub async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(limit)),
    }
}

/// Executes sections against a shared retrieval handle and synthesizer
#[derive(Clone)]
pub struct SectionWorker {
    retriever: Arc<dyn Retriever>,
    synthesizer: Arc<dyn Synthesizer>,
    persona: Arc<str>,
    max_subquery_workers: usize,
    call_timeout: Duration,
}

impl SectionWorker {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        synthesizer: Arc<dyn Synthesizer>,
        persona: impl Into<Arc<str>>,
        max_subquery_workers: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            synthesizer,
            persona: persona.into(),
            max_subquery_workers: max_subquery_workers.max(1),
            call_timeout,
        }
    }

    /// Produce the normalized text of one section
    ///
    /// # Errors
    /// The synthesis failure (or `Timeout`) of this section, or `Config` for
    /// an entry without queries. Question failures never surface here.
    pub async fn run(&self, entry: &SectionEntry) -> Result<SectionResult, EngineError> {
        let start = Instant::now();
        let instruction = entry.instruction().ok_or_else(|| {
            EngineError::Config(format!("Section '{}' has no queries", entry.name))
        })?;

        let answered = self
            .gather_context(&entry.name, entry.context_queries())
            .await;
        let context = assemble_context(&answered);

        debug!(
            section = %entry.name,
            answered = answered.len(),
            asked = entry.context_queries().len(),
            "Context gathered"
        );

        let raw = with_timeout(
            self.call_timeout,
            self.synthesizer
                .synthesize(&self.persona, &context, instruction),
        )
        .await?;

        info!(
            section = %entry.name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Section synthesized"
        );

        Ok(SectionResult::new(entry.name.clone(), normalize(&raw)))
    }

    /// Answer `queries` concurrently; successes come back in plan order
    async fn gather_context(&self, section: &SectionId, queries: &[String]) -> Vec<QueryResult> {
        if queries.is_empty() {
            return Vec::new();
        }

        let pool = Arc::new(Semaphore::new(self.max_subquery_workers.min(queries.len())));
        let mut tasks = JoinSet::new();

        for (position, query) in queries.iter().enumerate() {
            let pool = Arc::clone(&pool);
            let retriever = Arc::clone(&self.retriever);
            let query = query.clone();
            let limit = self.call_timeout;

            tasks.spawn(
                async move {
                    let result = match pool.acquire_owned().await {
                        Ok(_permit) => with_timeout(limit, retriever.answer(&query)).await,
                        Err(_) => Err(EngineError::Retrieval("Query pool closed".into())),
                    };
                    (position, query, result)
                }
                .in_current_span(),
            );
        }

        // Slots indexed by plan position; completion order is irrelevant
        let mut slots: Vec<Option<QueryResult>> = vec![None; queries.len()];

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, query, Ok(answer))) => {
                    slots[position] = Some(QueryResult::new(query, normalize(&answer)));
                }
                Ok((position, _query, Err(e))) => {
                    warn!(
                        section = %section,
                        query_index = position,
                        "Context query failed: {}",
                        scrub_secrets(&e.to_string())
                    );
                }
                Err(e) => {
                    warn!(section = %section, "Context query task aborted: {}", e);
                }
            }
        }

        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers after a per-question delay; "fail?" always errors
    struct SlowRetriever {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowRetriever {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Retriever for SlowRetriever {
        async fn answer(&self, question: &str) -> Result<String, EngineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay = match question {
                "q1?" => 60,
                "hang?" => 10_000,
                _ => 5,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if question == "fail?" {
                return Err(EngineError::Retrieval("no chunks".into()));
            }
            Ok(format!("[{}]", question.trim_end_matches('?')))
        }
    }

    #[derive(Default)]
    struct CapturingSynthesizer {
        contexts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Synthesizer for CapturingSynthesizer {
        async fn synthesize(
            &self,
            _system_prompt: &str,
            context: &str,
            instruction: &str,
        ) -> Result<String, EngineError> {
            self.contexts.lock().unwrap().push(context.to_string());
            Ok(format!("  \"{}\"\n", instruction))
        }
    }

    fn entry(queries: &[&str]) -> SectionEntry {
        SectionEntry {
            name: SectionId::new("a"),
            queries: queries.iter().map(|q| q.to_string()).collect(),
        }
    }

    fn worker(
        retriever: Arc<SlowRetriever>,
        synthesizer: Arc<CapturingSynthesizer>,
        pool: usize,
        timeout: Duration,
    ) -> SectionWorker {
        SectionWorker::new(retriever, synthesizer, "Persona.", pool, timeout)
    }

    #[tokio::test]
    async fn test_context_follows_plan_order() {
        let synthesizer = Arc::new(CapturingSynthesizer::default());
        let w = worker(
            Arc::new(SlowRetriever::new()),
            synthesizer.clone(),
            4,
            Duration::from_secs(5),
        );

        // q1 finishes well after q2
        let result = w.run(&entry(&["q1?", "q2?", "Write."])).await.unwrap();

        assert_eq!(result.text, "Write.");
        assert_eq!(
            synthesizer.contexts.lock().unwrap()[0],
            "Q: q1? A: q1 Q: q2? A: q2"
        );
    }

    #[tokio::test]
    async fn test_failed_query_is_dropped() {
        let synthesizer = Arc::new(CapturingSynthesizer::default());
        let w = worker(
            Arc::new(SlowRetriever::new()),
            synthesizer.clone(),
            4,
            Duration::from_secs(5),
        );

        w.run(&entry(&["fail?", "q2?", "Write."])).await.unwrap();

        assert_eq!(synthesizer.contexts.lock().unwrap()[0], "Q: q2? A: q2");
    }

    #[tokio::test]
    async fn test_timed_out_query_is_dropped() {
        let synthesizer = Arc::new(CapturingSynthesizer::default());
        let w = worker(
            Arc::new(SlowRetriever::new()),
            synthesizer.clone(),
            4,
            Duration::from_millis(200),
        );

        let result = w.run(&entry(&["hang?", "q2?", "Write."])).await.unwrap();

        assert_eq!(result.text, "Write.");
        assert_eq!(synthesizer.contexts.lock().unwrap()[0], "Q: q2? A: q2");
    }

    #[tokio::test]
    async fn test_single_query_section_has_empty_context() {
        let synthesizer = Arc::new(CapturingSynthesizer::default());
        let w = worker(
            Arc::new(SlowRetriever::new()),
            synthesizer.clone(),
            4,
            Duration::from_secs(5),
        );

        w.run(&entry(&["Write."])).await.unwrap();

        assert_eq!(synthesizer.contexts.lock().unwrap()[0], "");
    }

    #[tokio::test]
    async fn test_entry_without_queries_is_config_error() {
        let synthesizer = Arc::new(CapturingSynthesizer::default());
        let w = worker(
            Arc::new(SlowRetriever::new()),
            synthesizer.clone(),
            4,
            Duration::from_secs(5),
        );

        let err = w.run(&entry(&[])).await.unwrap_err();

        assert!(matches!(err, EngineError::Config(msg) if msg.contains("no queries")));
        assert!(synthesizer.contexts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_pool_is_bounded() {
        let retriever = Arc::new(SlowRetriever::new());
        let w = worker(
            retriever.clone(),
            Arc::new(CapturingSynthesizer::default()),
            2,
            Duration::from_secs(5),
        );

        w.run(&entry(&["a?", "b?", "c?", "d?", "e?", "Write."]))
            .await
            .unwrap();

        assert!(retriever.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_synthesis_timeout_fails_section() {
        struct Stuck;

        #[async_trait]
        impl Synthesizer for Stuck {
            async fn synthesize(&self, _: &str, _: &str, _: &str) -> Result<String, EngineError> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
        }

        let w = SectionWorker::new(
            Arc::new(SlowRetriever::new()),
            Arc::new(Stuck),
            "Persona.",
            1,
            Duration::from_millis(50),
        );

        let err = w.run(&entry(&["Write."])).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(limit) if limit == Duration::from_millis(50)));
        assert_eq!(err.to_string(), "Call timed out after 50ms");
    }
}
