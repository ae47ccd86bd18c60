use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub document_types: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

/// Liveness plus a cheap catalog probe. The service stays up without any
/// document types, but reports itself degraded.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let doc_type_count = state.runtime.list_doc_types().len();
    let document_types = if doc_type_count > 0 {
        HealthCheck { status: "ready", detail: format!("{doc_type_count} document type(s) loaded") }
    } else {
        HealthCheck { status: "degraded", detail: "no document types could be loaded".to_string() }
    };
    let ready = document_types.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "intake-server runtime initialized".to_string(),
        },
        document_types,
        active_sessions: state.runtime.active_sessions().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::health;
    use crate::routes::testing::{app_state, catalog_dir, QueueLlm};

    #[tokio::test]
    async fn health_reports_ready_with_document_types() {
        let dir = catalog_dir();
        let state = app_state(&dir, QueueLlm::new(["Hello! What is your name?", "{}"]));
        state.runtime.start_session("will").await.expect("session");

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.document_types.status, "ready");
        assert_eq!(payload.active_sessions, 1);
    }

    #[tokio::test]
    async fn health_is_degraded_without_document_types() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = app_state(&dir, QueueLlm::new([] as [&str; 0]));

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.active_sessions, 0);
    }
}
