//! In-memory vector index over leaf chunks

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Position of the chunk in the index
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// Leaf chunk texts with their embeddings
///
/// Immutable once built, so one index is shared by every concurrent query
/// of a summary run.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Pair chunks with their embeddings
    ///
    /// Returns `None` if the two lists differ in length.
    pub fn new(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Option<Self> {
        if chunks.len() != embeddings.len() {
            return None;
        }
        Some(Self { chunks, embeddings })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first
    ///
    /// Ties keep document order.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(index, embedding)| ScoredChunk {
                index,
                text: self.chunks[index].clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity; 0.0 when either vector has zero length or norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
