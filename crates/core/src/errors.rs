use thiserror::Error;

use crate::catalog::CatalogError;

/// Failure of a generation-engine call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("generation engine timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("generation engine transport failure: {0}")]
    Transport(String),
    #[error("generation engine rejected the configured credentials")]
    Authentication,
    #[error("generation engine quota exceeded: {0}")]
    RateLimited(String),
    #[error("generation engine returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation engine returned a malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("{0}")]
    NotFound(String),
    #[error("session `{0}` not found")]
    SessionNotFound(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("document generation requires completing the conversation first")]
    PrematureGeneration,
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<CatalogError> for ApplicationError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::DocTypeNotFound { .. }
            | CatalogError::TemplateNotFound { .. }
            | CatalogError::InvalidDocType(_) => Self::NotFound(value.to_string()),
            CatalogError::Read { .. } | CatalogError::Parse { .. } => {
                Self::Configuration(value.to_string())
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested resource does not exist.",
            Self::ServiceUnavailable { .. } => {
                "The document assistant is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Message safe to show to the client. Caller-addressable errors carry
    /// their own detail; infrastructure errors are replaced by a fixed text.
    pub fn client_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } | Self::NotFound { message, .. } => message.clone(),
            Self::ServiceUnavailable { .. } | Self::Internal { .. } => {
                self.user_message().to_string()
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::NotFound(message) => Self::NotFound { message, correlation_id },
            ApplicationError::SessionNotFound(_) => {
                Self::NotFound { message: "Session not found".to_owned(), correlation_id }
            }
            ApplicationError::PrematureGeneration => Self::BadRequest {
                message: ApplicationError::PrematureGeneration.to_string(),
                correlation_id,
            },
            ApplicationError::Engine(error) => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::catalog::CatalogError;
    use crate::errors::{ApplicationError, EngineError, InterfaceError};

    #[test]
    fn unknown_doc_type_maps_to_not_found_with_client_detail() {
        let interface = ApplicationError::from(CatalogError::DocTypeNotFound {
            doc_type: "lease".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::NotFound {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.client_message(), "document type `lease` not found");
    }

    #[test]
    fn session_not_found_hides_session_id() {
        let interface =
            ApplicationError::SessionNotFound("abc-123".to_owned()).into_interface("req-2");

        assert_eq!(interface.client_message(), "Session not found");
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn premature_generation_is_a_bad_request() {
        let interface = ApplicationError::PrematureGeneration.into_interface("req-3");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(
            interface.client_message(),
            "document generation requires completing the conversation first"
        );
    }

    #[test]
    fn engine_failure_maps_to_service_unavailable_without_leaking_detail() {
        let interface = ApplicationError::from(EngineError::Status {
            status: 500,
            body: "upstream stack trace".to_owned(),
        })
        .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert!(!interface.client_message().contains("stack trace"));
    }

    #[test]
    fn unreadable_config_maps_to_internal() {
        let interface = ApplicationError::from(CatalogError::Read {
            path: PathBuf::from("config/doc_types/will.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
        .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
