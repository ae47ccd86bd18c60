//! Collection state machine.
//!
//! A [`CollectionSession`] owns one conversation: its history, the fields
//! confirmed so far and the completion flag. Each call to
//! [`CollectionSession::advance`] runs one turn:
//!
//! 1. guardrail check (a blocked turn leaves no trace and makes no engine call)
//! 2. conversational engine call with the system directive and full history
//! 3. field extraction over the new transcript (failures are non-fatal)
//! 4. completion-sentinel detection
//!
//! All state changes of a turn are staged and committed together once both
//! engine calls have returned, so a dropped or failed turn leaves the session
//! exactly as it was.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use intake_core::{
    ApplicationError, CollectedData, ConversationTurn, DocConfig, EngineError, FieldValue,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extraction::FieldExtractor;
use crate::guardrails::{BlockReason, GuardrailDecision, GuardrailGate};
use crate::llm::{CompletionRequest, LlmClient};

/// Marker the engine is instructed to emit once every required field is
/// confirmed. Detected by substring search and stripped from visible replies.
pub const COMPLETION_SENTINEL: &str = "COLLECTION_COMPLETE";

pub const COMPLETION_ANNOUNCEMENT: &str =
    "I've collected all the information needed. Generating your document now...";

const CONVERSATION_TEMPERATURE: f32 = 0.2;
const CONVERSATION_MAX_TOKENS: u32 = 400;
const NOTHING_COLLECTED: &str = "Nothing yet";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub blocked: bool,
    pub block_reason: Option<BlockReason>,
    pub complete: bool,
    pub collected_data: CollectedData,
}

pub struct CollectionSession {
    id: String,
    config: Arc<DocConfig>,
    guardrails: GuardrailGate,
    llm: Arc<dyn LlmClient>,
    extractor: FieldExtractor,
    history: Vec<ConversationTurn>,
    collected: CollectedData,
    complete: bool,
}

impl CollectionSession {
    pub fn new(id: impl Into<String>, config: Arc<DocConfig>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            id: id.into(),
            guardrails: GuardrailGate::from_rules(&config.guardrails),
            extractor: FieldExtractor::new(llm.clone()),
            config,
            llm,
            history: Vec::new(),
            collected: CollectedData::new(),
            complete: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &DocConfig {
        &self.config
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn collected_data(&self) -> &CollectedData {
        &self.collected
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Names of collected fields whose text matches a configured vague keyword.
    pub fn vague_fields(&self) -> Vec<String> {
        self.collected
            .iter()
            .filter(|(_, value)| match value {
                FieldValue::Text(text) => self.guardrails.is_vague(text),
                FieldValue::List(items) => items.iter().any(|item| self.guardrails.is_vague(item)),
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Drafting needs either a finished conversation or at least one
    /// confirmed field.
    pub fn ensure_ready_for_drafting(&self) -> Result<(), ApplicationError> {
        if !self.complete && self.collected.is_empty() {
            return Err(ApplicationError::PrematureGeneration);
        }
        Ok(())
    }

    pub fn build_system_prompt(&self, today: NaiveDate) -> String {
        let fields = self
            .config
            .required_fields
            .iter()
            .map(|field| format!("- {}: {}", field.name, field.description))
            .collect::<Vec<_>>()
            .join("\n");
        let collected = if self.collected.is_empty() {
            NOTHING_COLLECTED.to_string()
        } else {
            serde_json::to_string_pretty(&self.collected)
                .unwrap_or_else(|_| NOTHING_COLLECTED.to_string())
        };

        let mut prompt = self
            .config
            .system_prompt
            .replace("{fields}", &fields)
            .replace("{collected}", &collected);
        prompt.push_str(&format!(
            "\n\nIMPORTANT: Today's actual date is {}. Use this as the current date for all purposes.",
            today.format("%d-%B-%Y")
        ));
        prompt
    }

    pub async fn advance(&mut self, user_message: &str) -> Result<TurnOutcome, EngineError> {
        self.advance_on(user_message, Local::now().date_naive()).await
    }

    pub async fn advance_on(
        &mut self,
        user_message: &str,
        today: NaiveDate,
    ) -> Result<TurnOutcome, EngineError> {
        if let GuardrailDecision::Block { reason, user_message: refusal } =
            self.guardrails.check(user_message)
        {
            info!(
                event_name = "intake.turn.blocked",
                session_id = %self.id,
                block_reason = reason.as_str(),
                "guardrail blocked inbound message"
            );
            return Ok(TurnOutcome {
                reply: refusal,
                blocked: true,
                block_reason: Some(reason),
                complete: self.complete,
                collected_data: self.collected.clone(),
            });
        }

        let mut transcript = self.history.clone();
        transcript.push(ConversationTurn::user(user_message));

        let request = CompletionRequest {
            system: Some(self.build_system_prompt(today)),
            messages: transcript.clone(),
            temperature: CONVERSATION_TEMPERATURE,
            max_tokens: CONVERSATION_MAX_TOKENS,
        };
        let assistant_reply = match self.llm.complete(&request).await {
            Ok(reply) => reply.trim().to_string(),
            Err(error) => {
                warn!(
                    event_name = "intake.turn.engine_failed",
                    session_id = %self.id,
                    error = %error,
                    "conversational engine call failed"
                );
                return Err(error);
            }
        };
        transcript.push(ConversationTurn::assistant(assistant_reply.clone()));

        let mut collected = self.collected.clone();
        match self.extractor.extract(&transcript, &self.config.field_names()).await {
            Ok(extracted) => merge_extracted(&self.id, &self.config, &mut collected, extracted),
            Err(error) => {
                warn!(
                    event_name = "intake.extraction.failed",
                    session_id = %self.id,
                    error = %error,
                    "field extraction failed; keeping previously collected data"
                );
            }
        }

        let (reply, saw_sentinel) = strip_sentinel(&assistant_reply);

        self.history = transcript;
        self.collected = collected;
        if saw_sentinel && !self.complete {
            self.complete = true;
            info!(
                event_name = "intake.session.collection_complete",
                session_id = %self.id,
                fields_collected = self.collected.len(),
                "engine signalled that collection is complete"
            );
        }

        debug!(
            event_name = "intake.turn.completed",
            session_id = %self.id,
            history_len = self.history.len(),
            fields_collected = self.collected.len(),
            "turn committed"
        );

        Ok(TurnOutcome {
            reply,
            blocked: false,
            block_reason: None,
            complete: self.complete,
            collected_data: self.collected.clone(),
        })
    }
}

/// Last-confirmed-wins merge. Keys outside the schema are kept.
fn merge_extracted(
    session_id: &str,
    config: &DocConfig,
    collected: &mut CollectedData,
    extracted: CollectedData,
) {
    for (name, value) in extracted {
        if !config.required_fields.iter().any(|field| field.name == name) {
            debug!(
                event_name = "intake.extraction.unknown_field",
                session_id = %session_id,
                field = %name,
                "merging extracted field that is not part of the schema"
            );
        }
        collected.insert(name, value);
    }
}

fn strip_sentinel(reply: &str) -> (String, bool) {
    if !reply.contains(COMPLETION_SENTINEL) {
        return (reply.to_string(), false);
    }

    let stripped = reply.replace(COMPLETION_SENTINEL, "").trim().to_string();
    if stripped.is_empty() {
        (COMPLETION_ANNOUNCEMENT.to_string(), true)
    } else {
        (stripped, true)
    }
}
