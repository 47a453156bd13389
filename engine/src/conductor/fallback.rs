//! Section fallback and omission policy

use sdk::types::SectionId;
use std::collections::BTreeMap;

/// What the model writes when told to "write an empty space"
pub const QUOTED_SPACE: &str = "' '";

/// Canned texts for sections the pipeline may fail to produce, and the
/// rule deciding when a section counts as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionFallbackPolicy {
    defaults: BTreeMap<SectionId, String>,
}

impl SectionFallbackPolicy {
    pub fn new(defaults: BTreeMap<SectionId, String>) -> Self {
        Self { defaults }
    }

    /// Fixed fallback id → canned text
    pub fn missing_defaults(&self) -> &BTreeMap<SectionId, String> {
        &self.defaults
    }

    /// True for text that must not appear as a section: blank after trimming,
    /// or the quoted-space sentinel. Any other text counts, however short.
    pub fn is_empty(text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.is_empty() || trimmed == QUOTED_SPACE
    }

    /// Insert the canned text for every fallback id absent from `responses`
    ///
    /// Returns the ids that were filled.
    pub fn fill_missing(&self, responses: &mut BTreeMap<SectionId, String>) -> Vec<SectionId> {
        let mut filled = Vec::new();
        for (id, text) in &self.defaults {
            if !responses.contains_key(id) {
                responses.insert(id.clone(), text.clone());
                filled.push(id.clone());
            }
        }
        filled
    }

    /// Drop every entry whose text [`is_empty`](Self::is_empty)
    ///
    /// Returns the ids that were removed.
    pub fn remove_empty(responses: &mut BTreeMap<SectionId, String>) -> Vec<SectionId> {
        let removed: Vec<SectionId> = responses
            .iter()
            .filter(|(_, text)| Self::is_empty(text))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            responses.remove(id);
        }
        removed
    }
}
