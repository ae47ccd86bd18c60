pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;

pub use catalog::{CatalogError, ConfigProvider, FileCatalog, TemplateProvider};
pub use domain::conversation::{CollectedData, ConversationTurn, FieldValue, Role};
pub use domain::document::{DocConfig, DocTypeSummary, FieldSpec, GuardrailRules};
pub use errors::{ApplicationError, EngineError, InterfaceError};
