//! LLM rerank of similarity search candidates
//!
//! The model sees the numbered candidates and the question and replies with
//! one `Doc: N, Relevance: M` line per useful document. Candidates it leaves
//! out are dropped. A reply with no usable line keeps similarity order.

use regex::Regex;
use std::sync::OnceLock;

use super::index::ScoredChunk;
use crate::llm::{LLMProvider, Message, Result};

static CHOICE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn choice_pattern() -> &'static Regex {
    CHOICE_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)doc(?:ument)?\s*:?\s*(\d+)\s*,\s*relevance\s*:?\s*(\d+(?:\.\d+)?)")
            .expect("Invalid rerank choice pattern")
    })
}

/// Render the rerank prompt for `question` over `candidates`
pub fn build_prompt(question: &str, candidates: &[ScoredChunk]) -> String {
    let mut prompt = String::from(
        "A list of documents is shown below. Each document has a number next to it. \
         A question is also provided.\n\
         Respond with the numbers of the documents you should consult to answer the question, \
         in order of relevance, as well as the relevance score. The relevance score is a number \
         from 1-10 based on how relevant you think the document is to the question.\n\
         Do not include any documents that are not relevant to the question.\n\
         Example format:\n\
         Doc: 9, Relevance: 7\n\
         Doc: 3, Relevance: 4\n\
         Doc: 7, Relevance: 3\n\n",
    );

    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!("Document {}:\n{}\n\n", i + 1, candidate.text));
    }

    prompt.push_str(&format!("Question: {}\nAnswer:\n", question));
    prompt
}

/// Parse `Doc: N, Relevance: M` lines into (zero based position, relevance)
///
/// Out of range and repeated document numbers are skipped. The result is
/// sorted by relevance, best first, keeping reply order on ties.
pub fn parse_choices(reply: &str, candidate_count: usize) -> Vec<(usize, f32)> {
    let mut seen = vec![false; candidate_count];
    let mut choices = Vec::new();

    for caps in choice_pattern().captures_iter(reply) {
        let (Ok(doc), Ok(relevance)) = (caps[1].parse::<usize>(), caps[2].parse::<f32>()) else {
            continue;
        };
        if doc == 0 || doc > candidate_count || seen[doc - 1] {
            continue;
        }
        seen[doc - 1] = true;
        choices.push((doc - 1, relevance));
    }

    choices.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    choices
}

/// Keep the `top_n` candidates the model judges most relevant
///
/// # Errors
/// Propagates the model call failure. An unparseable reply is not an error.
pub async fn rerank(
    provider: &dyn LLMProvider,
    question: &str,
    candidates: Vec<ScoredChunk>,
    top_n: usize,
) -> Result<Vec<ScoredChunk>> {
    if candidates.len() <= 1 {
        return Ok(candidates);
    }

    let reply = provider
        .generate(&[Message::user(build_prompt(question, &candidates))])
        .await?;

    let choices = parse_choices(&reply, candidates.len());
    if choices.is_empty() {
        tracing::debug!("Rerank reply had no document choices, keeping similarity order");
        return Ok(candidates.into_iter().take(top_n).collect());
    }

    Ok(choices
        .into_iter()
        .take(top_n)
        .map(|(pos, relevance)| ScoredChunk {
            score: relevance,
            ..candidates[pos].clone()
        })
        .collect())
}
