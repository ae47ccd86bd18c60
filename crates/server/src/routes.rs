//! HTTP surface of the intake service.
//!
//! JSON API Endpoints:
//! - `GET  /health`                    - liveness, catalog probe, active sessions
//! - `GET  /doc-types`                 - list available document types
//! - `POST /session/start`             - open a session and return the opening message
//! - `POST /session/chat`              - run one conversation turn
//! - `POST /session/generate`          - draft the document from collected data
//! - `GET  /session/{session_id}/status` - progress snapshot
//! - `DELETE /session/{session_id}`    - discard a session
//!
//! Static:
//! - `GET  /`          - `<static_dir>/index.html`
//! - `GET  /static/*`  - files under `<static_dir>`

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use intake_agent::{ChatTurn, GeneratedDocument, IntakeRuntime, SessionStarted, SessionStatus};
use intake_core::{ApplicationError, CollectedData, DocTypeSummary, InterfaceError};
use serde::{Deserialize, Serialize};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, warn};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<IntakeRuntime>,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub doc_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct DocTypesResponse {
    pub doc_types: Vec<DocTypeSummary>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub session_id: String,
    pub doc_type: String,
    pub document: String,
    pub missing_fields: Vec<String>,
    pub collected_data: CollectedData,
}

impl From<GeneratedDocument> for GenerateResponse {
    fn from(value: GeneratedDocument) -> Self {
        Self {
            session_id: value.session_id,
            doc_type: value.doc_type,
            document: value.document,
            missing_fields: value.missing_fields,
            collected_data: value.collected_data,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

/// Error response rendered as `{error, correlation_id}`.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.into(),
            correlation_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.0.client_message(),
            correlation_id: self.0.correlation_id().to_string(),
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        Self(value.into_interface(Uuid::new_v4().to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "intake.http.error",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "intake.http.rejected",
                correlation_id = %self.0.correlation_id(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }
        (status, Json(self.body())).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(runtime: Arc<IntakeRuntime>, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/doc-types", get(list_doc_types))
        .route("/session/start", post(start_session))
        .route("/session/chat", post(chat))
        .route("/session/generate", post(generate))
        .route("/session/{session_id}/status", get(session_status))
        .route("/session/{session_id}", delete(end_session))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(AppState { runtime })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn list_doc_types(State(state): State<AppState>) -> Json<DocTypesResponse> {
    Json(DocTypesResponse { doc_types: state.runtime.list_doc_types() })
}

pub async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<StartSessionRequest>,
) -> Result<Json<SessionStarted>, ApiError> {
    let doc_type = body.doc_type.trim();
    if doc_type.is_empty() {
        return Err(ApiError::bad_request("doc_type is required"));
    }

    Ok(Json(state.runtime.start_session(doc_type).await?))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatTurn>, ApiError> {
    if body.message.trim().is_empty() {
        if !state.runtime.has_session(&body.session_id).await {
            return Err(ApplicationError::SessionNotFound(body.session_id).into());
        }
        return Err(ApiError::bad_request("message must not be empty"));
    }

    Ok(Json(state.runtime.chat(&body.session_id, &body.message).await?))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    Ok(Json(state.runtime.generate(&body.session_id).await?.into()))
}

pub async fn session_status(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, ApiError> {
    Ok(Json(state.runtime.status(&session_id).await?))
}

pub async fn end_session(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if state.runtime.end_session(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApplicationError::SessionNotFound(session_id).into())
    }
}
