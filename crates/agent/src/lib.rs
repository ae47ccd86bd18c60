//! Intake agent - the conversation core of the document intake service
//!
//! This crate drives a goal-directed dialogue that collects the fields a legal
//! document needs, then hands the confirmed data to the drafter:
//! - Screens every inbound message before it reaches the engine (`guardrails`)
//! - Runs one turn of the collection loop per message (`conversation`)
//! - Reconciles the transcript into confirmed field values (`extraction`)
//! - Fills and drafts the final document (`drafting`)
//!
//! # Turn flow
//!
//! 1. **Guardrail Gate** - refuse prompt injection and legal-advice requests
//! 2. **Conversational call** - system directive + full history
//! 3. **Extraction** - deterministic call, failures leave data unchanged
//! 4. **Completion check** - `COLLECTION_COMPLETE` sentinel in the reply
//!
//! # Key Types
//!
//! - `IntakeRuntime` - entry point for the HTTP layer (see `runtime` module)
//! - `LlmClient` - pluggable generation engine (see `llm` module)
//! - `CollectionSession` - per-session state machine
//!
//! # Safety Principle
//!
//! The engine only converses and transcribes. It never decides which fields
//! are confirmed on its own word: only values the user stated are extracted,
//! and only the drafter turns them into document text.

pub mod conversation;
pub mod drafting;
pub mod extraction;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod sessions;

pub use conversation::{CollectionSession, TurnOutcome, COMPLETION_SENTINEL};
pub use drafting::{DocumentDrafter, DraftedDocument};
pub use guardrails::{BlockReason, GuardrailDecision, GuardrailGate};
pub use llm::{CompletionRequest, LlmClient};
pub use runtime::{ChatTurn, GeneratedDocument, IntakeRuntime, SessionStarted, SessionStatus};
