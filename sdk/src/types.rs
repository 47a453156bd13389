//! Section and query result types

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Key of one output section
///
/// Section ids are unique within a plan and double as the sort key of the
/// final summary: sections are emitted in ascending lexicographic order of
/// their id, whatever order they finished in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    /// Create a new SectionId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Answer to one context-gathering question
///
/// Lives only inside a section worker, between the retrieval call and
/// context assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    pub query: String,
    pub answer: String,
}

impl QueryResult {
    /// Create a new QueryResult
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
        }
    }

    /// Render the pair as a two-line Q/A block
    pub fn to_block(&self) -> String {
        format!("Q: {}\nA: {}", self.query, self.answer)
    }
}

/// Final, normalized text of one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section: SectionId,
    pub text: String,
}

impl SectionResult {
    /// Create a new SectionResult
    pub fn new(section: impl Into<SectionId>, text: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            text: text.into(),
        }
    }
}
