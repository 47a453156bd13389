//! Retrieval-augmented question answering over one document
//!
//! [`EmbeddingIndexer`] chunks the document text hierarchically and embeds
//! the leaf chunks. The resulting [`QueryEngine`] answers a question in four
//! steps:
//!
//! 1. embed the question
//! 2. take the `similarity_top_k` closest leaves
//! 3. let the model rerank them down to `rerank_top_n`
//! 4. answer from the surviving chunks only

pub mod chunker;
pub mod index;
pub mod rerank;

use async_trait::async_trait;
use sdk::collaborator::{Indexer, Retriever};
use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::llm::{LLMProvider, Message};
use crate::secrets::scrub_secrets;
use chunker::chunk_hierarchical;
use index::{ScoredChunk, VectorIndex};

const QA_SYSTEM_PROMPT: &str = "You are an expert Q&A system that is trusted around the world.\n\
Always answer the query using the provided context information, and not prior knowledge.\n\
Never directly reference the given context in your answer.";

/// Render the grounded answering prompt
pub fn build_qa_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the context information and not prior knowledge, answer the query.\n\
         Query: {}\n\
         Answer: ",
        context, question
    )
}

/// Retrieval handle for one indexed document
pub struct QueryEngine {
    provider: Arc<dyn LLMProvider>,
    index: VectorIndex,
    similarity_top_k: usize,
    rerank_top_n: usize,
}

impl QueryEngine {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        index: VectorIndex,
        similarity_top_k: usize,
        rerank_top_n: usize,
    ) -> Self {
        Self {
            provider,
            index,
            similarity_top_k,
            rerank_top_n,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Chunks the answer to `question` would be grounded in
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, EngineError> {
        let query_vec = self
            .provider
            .embed(&[question.to_string()])
            .await
            .map_err(|e| retrieval_error("embedding", e))?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Retrieval("No embedding returned for question".into()))?;

        let candidates = self.index.top_k(&query_vec, self.similarity_top_k);

        rerank::rerank(
            self.provider.as_ref(),
            question,
            candidates,
            self.rerank_top_n,
        )
        .await
        .map_err(|e| retrieval_error("rerank", e))
    }
}

#[async_trait]
impl Retriever for QueryEngine {
    async fn answer(&self, question: &str) -> Result<String, EngineError> {
        let start = Instant::now();
        let chunks = self.retrieve(question).await?;

        let messages = [
            Message::system(QA_SYSTEM_PROMPT),
            Message::user(build_qa_prompt(question, &chunks)),
        ];

        let answer = self
            .provider
            .generate(&messages)
            .await
            .map_err(|e| retrieval_error("answer", e))?;

        tracing::debug!(
            chunks = chunks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered retrieval question"
        );

        Ok(answer)
    }
}

fn retrieval_error(stage: &str, e: crate::llm::LLMError) -> EngineError {
    EngineError::Retrieval(format!("{} failed: {}", stage, scrub_secrets(&e.to_string())))
}

/// Builds a [`QueryEngine`] from document text
pub struct EmbeddingIndexer {
    provider: Arc<dyn LLMProvider>,
    chunk_overlap: usize,
    embed_batch_size: usize,
    similarity_top_k: usize,
    rerank_top_n: usize,
}

impl EmbeddingIndexer {
    pub fn new(provider: Arc<dyn LLMProvider>, pipeline: &PipelineConfig) -> Self {
        Self {
            provider,
            chunk_overlap: pipeline.chunk_overlap,
            embed_batch_size: pipeline.embed_batch_size.max(1),
            similarity_top_k: pipeline.similarity_top_k,
            rerank_top_n: pipeline.rerank_top_n,
        }
    }

    /// Chunk and embed `text` into a concrete [`QueryEngine`]
    pub async fn build_engine(
        &self,
        text: &str,
        chunk_size_tiers: &[usize],
    ) -> Result<QueryEngine, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::Indexing("Document contains no text".into()));
        }
        if chunk_size_tiers.is_empty() {
            return Err(EngineError::Indexing("No chunk size tiers given".into()));
        }

        let tree = chunk_hierarchical(text, chunk_size_tiers, self.chunk_overlap);
        let leaves: Vec<String> = tree.leaves().map(|n| n.text.clone()).collect();
        if leaves.is_empty() {
            return Err(EngineError::Indexing("Document produced no chunks".into()));
        }

        let start = Instant::now();
        let mut embeddings = Vec::with_capacity(leaves.len());
        for batch in leaves.chunks(self.embed_batch_size) {
            let vectors = self.provider.embed(batch).await.map_err(|e| {
                EngineError::Indexing(format!(
                    "Embedding failed: {}",
                    scrub_secrets(&e.to_string())
                ))
            })?;
            embeddings.extend(vectors);
        }

        let index = VectorIndex::new(leaves, embeddings).ok_or_else(|| {
            EngineError::Indexing("Embedding count does not match chunk count".into())
        })?;

        tracing::info!(
            nodes = tree.nodes().len(),
            leaves = index.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built document index"
        );

        Ok(QueryEngine::new(
            Arc::clone(&self.provider),
            index,
            self.similarity_top_k,
            self.rerank_top_n,
        ))
    }
}

#[async_trait]
impl Indexer for EmbeddingIndexer {
    async fn build_index(
        &self,
        text: &str,
        chunk_size_tiers: &[usize],
    ) -> Result<Arc<dyn Retriever>, EngineError> {
        let engine = self.build_engine(text, chunk_size_tiers).await?;
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, Result as LLMResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds by keyword presence, answers with the last user message
    struct KeywordProvider {
        embed_calls: AtomicUsize,
        rerank_reply: String,
    }

    impl KeywordProvider {
        fn new(rerank_reply: &str) -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
                rerank_reply: rerank_reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for KeywordProvider {
        fn name(&self) -> &str {
            "keyword"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(&self, messages: &[Message]) -> LLMResult<String> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last.starts_with("A list of documents") {
                Ok(self.rerank_reply.clone())
            } else {
                Ok(last)
            }
        }

        async fn embed(&self, texts: &[String]) -> LLMResult<Vec<Vec<f32>>> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    vec![
                        t.contains("risk") as u8 as f32,
                        t.contains("benefit") as u8 as f32,
                        0.01,
                    ]
                })
                .collect())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(&self, _messages: &[Message]) -> LLMResult<String> {
            Err(LLMError::RateLimitExceeded)
        }

        async fn embed(&self, _texts: &[String]) -> LLMResult<Vec<Vec<f32>>> {
            Err(LLMError::AuthenticationFailed(
                "bad key sk-abcdefghijklmnopqrstuvwxyz".into(),
            ))
        }
    }

    fn pipeline() -> PipelineConfig {
        PipelineConfig {
            chunk_overlap: 0,
            embed_batch_size: 2,
            similarity_top_k: 2,
            rerank_top_n: 1,
            ..PipelineConfig::default()
        }
    }

    const DOCUMENT: &str = "the main risk is nausea. the benefit is none. visits are weekly. \
                            travel costs are covered.";

    #[tokio::test]
    async fn test_empty_document_is_indexing_error() {
        let indexer = EmbeddingIndexer::new(Arc::new(KeywordProvider::new("")), &pipeline());
        let err = indexer.build_index("  \n", &[4, 2]).await.err().unwrap();
        assert!(matches!(err, EngineError::Indexing(_)));
    }

    #[tokio::test]
    async fn test_leaves_are_embedded_in_batches() {
        let provider = Arc::new(KeywordProvider::new(""));
        let indexer = EmbeddingIndexer::new(provider.clone(), &pipeline());

        let engine = indexer.build_engine(DOCUMENT, &[8, 4]).await.unwrap();
        // 16 words, 4-word leaves, 2 per batch
        assert_eq!(engine.chunk_count(), 4);
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_answer_grounded_in_reranked_chunk() {
        let provider = Arc::new(KeywordProvider::new("Doc: 1, Relevance: 9"));
        let indexer = EmbeddingIndexer::new(provider, &pipeline());
        let retriever = indexer.build_index(DOCUMENT, &[8, 4]).await.unwrap();

        let answer = retriever.answer("What is the risk?").await.unwrap();
        assert!(answer.contains("the main risk is"));
        assert!(answer.contains("Query: What is the risk?"));
        assert!(!answer.contains("travel costs"));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_scrubbed_indexing_error() {
        let indexer = EmbeddingIndexer::new(Arc::new(FailingProvider), &pipeline());
        let err = indexer.build_index(DOCUMENT, &[8, 4]).await.err().unwrap();

        match err {
            EngineError::Indexing(msg) => {
                assert!(msg.contains("[REDACTED]"));
                assert!(!msg.contains("sk-abcdef"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_qa_prompt_layout() {
        let chunks = vec![ScoredChunk {
            index: 0,
            text: "Visits are weekly.".into(),
            score: 1.0,
        }];
        let prompt = build_qa_prompt("How often?", &chunks);
        assert!(prompt.starts_with("Context information is below."));
        assert!(prompt.contains("Visits are weekly."));
        assert!(prompt.ends_with("Query: How often?\nAnswer: "));
    }
}
