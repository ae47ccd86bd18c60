use std::sync::Arc;

use intake_agent::{DocumentDrafter, IntakeRuntime, LlmClient};
use intake_core::config::{AppConfig, ConfigError};
use intake_core::{ConfigProvider, FileCatalog};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_http::OpenAiCompatibleClient;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<IntakeRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("generation engine client could not be built: {0}")]
    EngineClient(#[source] reqwest::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let catalog =
        Arc::new(FileCatalog::new(&config.documents.config_dir, &config.documents.template_dir));
    let doc_types = catalog.list_doc_types();
    if doc_types.is_empty() {
        warn!(
            event_name = "system.bootstrap.no_doc_types",
            correlation_id = "bootstrap",
            config_dir = %config.documents.config_dir.display(),
            "no document types available; sessions cannot be started"
        );
    } else {
        info!(
            event_name = "system.bootstrap.catalog_loaded",
            correlation_id = "bootstrap",
            doc_types = doc_types.len(),
            "document type catalog loaded"
        );
    }

    let chat_llm: Arc<dyn LlmClient> = Arc::new(
        OpenAiCompatibleClient::new(&config.llm, config.llm.chat_model.clone())
            .map_err(BootstrapError::EngineClient)?,
    );
    let drafting_llm: Arc<dyn LlmClient> = Arc::new(
        OpenAiCompatibleClient::new(&config.llm, config.llm.drafting_model.clone())
            .map_err(BootstrapError::EngineClient)?,
    );
    info!(
        event_name = "system.bootstrap.engine_ready",
        correlation_id = "bootstrap",
        base_url = %config.llm.effective_base_url(),
        chat_model = %config.llm.chat_model,
        drafting_model = %config.llm.drafting_model,
        "generation engine clients initialized"
    );

    let drafter = DocumentDrafter::new(catalog.clone(), drafting_llm);
    let runtime = Arc::new(IntakeRuntime::new(catalog, chat_llm, drafter));

    Ok(Application { config, runtime })
}

#[cfg(test)]
mod tests {
    use intake_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};
    use crate::routes::testing::catalog_dir;

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_api_key() {
        let result = bootstrap(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                llm_api_key: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_wires_catalog_into_runtime() {
        let dir = catalog_dir();

        let app = bootstrap(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::Ollama),
                documents_config_dir: Some(dir.path().join("doc_types")),
                documents_template_dir: Some(dir.path().join("templates")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed for a local provider");

        let doc_types = app.runtime.list_doc_types();
        assert_eq!(doc_types.len(), 1);
        assert_eq!(doc_types[0].doc_type, "will");
        assert_eq!(app.runtime.active_sessions().await, 0);
    }
}
