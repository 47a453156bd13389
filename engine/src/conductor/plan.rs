//! Section plan
//!
//! A plan names every section the summary may contain and the ordered
//! questions behind it. All but the last question gather context through
//! retrieval; the last one is the instruction handed to the synthesizer.
//! The plan also carries the persona used for synthesis and the canned
//! fallback texts.
//!
//! Plans are TOML:
//!
//! ```toml
//! persona = "You are a bioethicist."
//!
//! [sections.section1]
//! queries = ["Who can take part?", "Write the eligibility paragraph."]
//!
//! [fallbacks]
//! section2 = "Canned text."
//! ```
//!
//! The Key Information plan ships inside the binary. A plan is loaded once,
//! validated, and then only read.

use sdk::errors::EngineError;
use sdk::types::SectionId;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::fallback::SectionFallbackPolicy;
use crate::config::PipelineConfig;

const BUILTIN_PLAN: &str = include_str!("../../plans/key_information.toml");

/// One section and its questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEntry {
    pub name: SectionId,
    /// Context-gathering questions followed by the final instruction
    pub queries: Vec<String>,
}

impl SectionEntry {
    /// Questions answered through retrieval; empty without queries
    pub fn context_queries(&self) -> &[String] {
        self.queries
            .split_last()
            .map(|(_, context)| context)
            .unwrap_or_default()
    }

    /// Instruction passed to the synthesizer, the last query
    pub fn instruction(&self) -> Option<&str> {
        self.queries.last().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanFile {
    persona: String,
    #[serde(default)]
    sections: BTreeMap<String, SectionTable>,
    #[serde(default)]
    fallbacks: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionTable {
    queries: Vec<String>,
}

/// Validated, immutable section plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    persona: String,
    sections: Vec<SectionEntry>,
    fallbacks: SectionFallbackPolicy,
}

impl SectionPlan {
    /// Build and validate a plan
    ///
    /// # Errors
    /// `EngineError::Config` if the persona is blank, there are no sections,
    /// a section id is blank or repeated, a section has no queries or a
    /// blank query, or a fallback text is empty.
    pub fn new(
        persona: impl Into<String>,
        sections: Vec<SectionEntry>,
        fallbacks: BTreeMap<SectionId, String>,
    ) -> Result<Self, EngineError> {
        let persona = persona.into();
        if persona.trim().is_empty() {
            return Err(EngineError::Config("Plan persona must not be blank".into()));
        }
        if sections.is_empty() {
            return Err(EngineError::Config(
                "Plan must contain at least one section".into(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for entry in &sections {
            if entry.name.as_str().trim().is_empty() {
                return Err(EngineError::Config("Section ids must not be blank".into()));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(EngineError::Config(format!(
                    "Section '{}' is defined twice",
                    entry.name
                )));
            }
            if entry.queries.is_empty() {
                return Err(EngineError::Config(format!(
                    "Section '{}' has no queries",
                    entry.name
                )));
            }
            if let Some(pos) = entry.queries.iter().position(|q| q.trim().is_empty()) {
                return Err(EngineError::Config(format!(
                    "Section '{}' query {} is blank",
                    entry.name,
                    pos + 1
                )));
            }
        }

        for (id, text) in &fallbacks {
            if id.as_str().trim().is_empty() {
                return Err(EngineError::Config("Fallback ids must not be blank".into()));
            }
            if SectionFallbackPolicy::is_empty(text) {
                return Err(EngineError::Config(format!(
                    "Fallback text for '{}' is empty",
                    id
                )));
            }
        }

        Ok(Self {
            persona,
            sections,
            fallbacks: SectionFallbackPolicy::new(fallbacks),
        })
    }

    /// The Key Information plan compiled into the binary
    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_toml_str(BUILTIN_PLAN)
    }

    /// Parse and validate a plan from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let file: PlanFile = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse section plan: {}", e)))?;

        let sections = file
            .sections
            .into_iter()
            .map(|(name, table)| SectionEntry {
                name: SectionId::new(name),
                queries: table.queries,
            })
            .collect();

        let fallbacks = file
            .fallbacks
            .into_iter()
            .map(|(id, text)| (SectionId::new(id), text))
            .collect();

        Self::new(file.persona, sections, fallbacks)
    }

    /// Load a plan file
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "Failed to read section plan {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&contents)
    }

    /// Pick the plan for a run
    ///
    /// Precedence: `override_path` (the `--plan` flag), then
    /// `pipeline.plan_path`, then the built-in plan.
    pub fn resolve(
        override_path: Option<&Path>,
        pipeline: &PipelineConfig,
    ) -> Result<Self, EngineError> {
        match override_path.or(pipeline.plan_path.as_deref()) {
            Some(path) => {
                tracing::debug!("Loading section plan from {}", path.display());
                Self::load_from_path(path)
            }
            None => Self::builtin(),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Sections in id order
    pub fn sections(&self) -> &[SectionEntry] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn fallback_policy(&self) -> &SectionFallbackPolicy {
        &self.fallbacks
    }

    /// True if `id` may appear in a summary built from this plan
    pub fn knows(&self, id: &SectionId) -> bool {
        self.sections.iter().any(|s| &s.name == id)
            || self.fallbacks.missing_defaults().contains_key(id)
    }
}
