//! Section synthesis through a chat model

use async_trait::async_trait;
use sdk::collaborator::Synthesizer;
use sdk::errors::EngineError;
use std::sync::Arc;

use crate::llm::{LLMProvider, Message};
use crate::secrets::scrub_secrets;

/// Prefix of the user turn carrying the gathered context
pub const CONTEXT_HEADER: &str = "RELEVANT STUDY INFORMATION:\n\n";

/// Writes a section from its context with one chat completion
///
/// The request is the persona as system prompt, then the context and the
/// instruction as two separate user turns.
pub struct ChatSynthesizer {
    provider: Arc<dyn LLMProvider>,
}

impl ChatSynthesizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    pub fn build_messages(system_prompt: &str, context: &str, instruction: &str) -> Vec<Message> {
        vec![
            Message::system(system_prompt),
            Message::user(format!("{}{}", CONTEXT_HEADER, context)),
            Message::user(instruction),
        ]
    }
}

#[async_trait]
impl Synthesizer for ChatSynthesizer {
    async fn synthesize(
        &self,
        system_prompt: &str,
        context: &str,
        instruction: &str,
    ) -> Result<String, EngineError> {
        let messages = Self::build_messages(system_prompt, context, instruction);

        self.provider
            .generate(&messages)
            .await
            .map_err(|e| EngineError::Synthesis(scrub_secrets(&e.to_string())))
    }
}
