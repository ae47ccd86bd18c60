use std::sync::Arc;
use std::time::Duration;

use intake_core::{ApplicationError, CollectedData, ConfigProvider, DocTypeSummary};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::CollectionSession;
use crate::drafting::{DocumentDrafter, DraftedDocument};
use crate::guardrails::BlockReason;
use crate::llm::LlmClient;
use crate::sessions::{SessionStore, SharedSession};

/// First user turn sent on behalf of the client so the assistant opens the
/// conversation.
pub const OPENING_MESSAGE: &str = "Hello, I'd like to create a document.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStarted {
    pub session_id: String,
    pub doc_type: String,
    pub display_name: String,
    pub opening_message: String,
    pub total_fields: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub session_id: String,
    pub reply: String,
    pub blocked: bool,
    pub block_reason: Option<BlockReason>,
    pub is_complete: bool,
    pub fields_collected: usize,
    pub total_fields: usize,
    pub collected_data: CollectedData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub session_id: String,
    pub doc_type: String,
    pub document: String,
    pub missing_fields: Vec<String>,
    pub collected_data: CollectedData,
    pub method: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub is_complete: bool,
    pub collected_data: CollectedData,
    pub fields_collected: usize,
    pub total_fields: usize,
    pub vague_fields: Vec<String>,
}

/// Entry point used by the outer surfaces. Wires the catalog, the
/// conversational engine, the drafter and the session registry together.
pub struct IntakeRuntime {
    catalog: Arc<dyn ConfigProvider>,
    chat_llm: Arc<dyn LlmClient>,
    drafter: DocumentDrafter,
    sessions: SessionStore,
}

impl IntakeRuntime {
    pub fn new(
        catalog: Arc<dyn ConfigProvider>,
        chat_llm: Arc<dyn LlmClient>,
        drafter: DocumentDrafter,
    ) -> Self {
        Self { catalog, chat_llm, drafter, sessions: SessionStore::new() }
    }

    pub fn list_doc_types(&self) -> Vec<DocTypeSummary> {
        self.catalog.list_doc_types()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    pub async fn start_session(&self, doc_type: &str) -> Result<SessionStarted, ApplicationError> {
        let config = Arc::new(self.catalog.load_config(doc_type)?);
        let session_id = Uuid::new_v4().to_string();
        let mut session = CollectionSession::new(&session_id, config.clone(), self.chat_llm.clone());

        // Registered only after the opening turn succeeds.
        let opening = session.advance(OPENING_MESSAGE).await?;
        self.sessions.insert(session).await;

        info!(
            event_name = "intake.session.started",
            session_id = %session_id,
            doc_type = %config.document_type,
            total_fields = config.total_fields(),
            "intake session started"
        );

        Ok(SessionStarted {
            session_id,
            doc_type: config.document_type.clone(),
            display_name: config.display_name().to_string(),
            opening_message: opening.reply,
            total_fields: config.total_fields(),
        })
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatTurn, ApplicationError> {
        let shared = self.session(session_id).await?;
        let mut session = shared.lock().await;
        let outcome = session.advance(message).await?;

        Ok(ChatTurn {
            session_id: session_id.to_string(),
            reply: outcome.reply,
            blocked: outcome.blocked,
            block_reason: outcome.block_reason,
            is_complete: outcome.complete,
            fields_collected: outcome.collected_data.len(),
            total_fields: session.config().total_fields(),
            collected_data: outcome.collected_data,
        })
    }

    pub async fn generate(&self, session_id: &str) -> Result<GeneratedDocument, ApplicationError> {
        let shared = self.session(session_id).await?;
        let (doc_type, collected) = {
            let session = shared.lock().await;
            if let Err(error) = session.ensure_ready_for_drafting() {
                warn!(
                    event_name = "intake.document.premature",
                    session_id = %session_id,
                    "document generation requested before any data was collected"
                );
                return Err(error);
            }
            (session.config().document_type.clone(), session.collected_data().clone())
        };

        let DraftedDocument { document, missing_fields, collected_data, method } =
            self.drafter.generate(&doc_type, &collected).await?;

        info!(
            event_name = "intake.session.generated",
            session_id = %session_id,
            doc_type = %doc_type,
            missing_fields = missing_fields.len(),
            "document generated for session"
        );

        Ok(GeneratedDocument {
            session_id: session_id.to_string(),
            doc_type,
            document,
            missing_fields,
            collected_data,
            method,
        })
    }

    pub async fn status(&self, session_id: &str) -> Result<SessionStatus, ApplicationError> {
        let shared = self.session(session_id).await?;
        let session = shared.lock().await;

        Ok(SessionStatus {
            session_id: session_id.to_string(),
            is_complete: session.is_complete(),
            collected_data: session.collected_data().clone(),
            fields_collected: session.collected_data().len(),
            total_fields: session.config().total_fields(),
            vague_fields: session.vague_fields(),
        })
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.get(session_id).await.is_some()
    }

    pub async fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).await
    }

    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let evicted = self.sessions.evict_idle(max_idle).await;
        if evicted > 0 {
            info!(
                event_name = "intake.session.evicted",
                evicted,
                max_idle_secs = max_idle.as_secs(),
                "evicted idle intake sessions"
            );
        }
        evicted
    }

    async fn session(&self, session_id: &str) -> Result<SharedSession, ApplicationError> {
        self.sessions
            .get(session_id)
            .await
            .ok_or_else(|| ApplicationError::SessionNotFound(session_id.to_string()))
    }
}
