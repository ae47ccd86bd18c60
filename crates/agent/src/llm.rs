use async_trait::async_trait;
use intake_core::{ConversationTurn, EngineError};

/// One text-completion request to the generation engine.
///
/// A `temperature` of zero asks the engine for deterministic output. Whether
/// the engine honours that is outside this crate's control.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ConversationTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EngineError>;
}
