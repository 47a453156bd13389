//! Section context assembly
//!
//! Turns the answered context-gathering questions of one section into the
//! context block handed to the synthesizer.

use sdk::types::QueryResult;

use super::normalizer::normalize;

/// Render answered questions as `Q: ..\nA: ..` blocks separated by a blank
/// line, in the order given, then normalize the whole block.
///
/// Normalization collapses the line structure, so the synthesizer receives
/// one line of `Q: .. A: .. Q: .. A: ..` text.
pub fn assemble_context(results: &[QueryResult]) -> String {
    let blocks: Vec<String> = results.iter().map(QueryResult::to_block).collect();
    normalize(&blocks.join("\n\n"))
}
