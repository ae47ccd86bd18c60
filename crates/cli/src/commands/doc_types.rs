use intake_core::config::{AppConfig, LoadOptions};
use intake_core::{ConfigProvider, DocTypeSummary, FileCatalog};
use serde::Serialize;

use super::{escape_json, CommandResult};

#[derive(Debug, Serialize)]
struct DocTypesListing {
    command: &'static str,
    status: &'static str,
    config_dir: String,
    doc_types: Vec<DocTypeSummary>,
}

/// Lists the document types the server would offer. Definitions that fail to
/// parse are skipped, the same way `GET /doc-types` skips them.
///
/// Runs the same full config validation as server startup, so a provider that
/// needs an API key fails with `config_validation` (exit 2) when none is set,
/// even though listing never calls the engine.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("doc-types", "config_validation", error.to_string(), 2)
        }
    };

    let catalog = FileCatalog::new(&config.documents.config_dir, &config.documents.template_dir);
    let doc_types = catalog.list_doc_types();
    if doc_types.is_empty() {
        return CommandResult::failure(
            "doc-types",
            "catalog_empty",
            format!(
                "no loadable document types found in `{}`",
                config.documents.config_dir.display()
            ),
            3,
        );
    }

    let listing = DocTypesListing {
        command: "doc-types",
        status: "ok",
        config_dir: config.documents.config_dir.display().to_string(),
        doc_types,
    };
    let output = serde_json::to_string_pretty(&listing).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"doc-types\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });

    CommandResult { exit_code: 0, output }
}
