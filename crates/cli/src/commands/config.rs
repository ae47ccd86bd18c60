use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use intake_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let llm_api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries = [
        (
            "llm.provider",
            config.llm.provider.as_str().to_string(),
            source("llm.provider", &["INTAKE_LLM_PROVIDER"]),
        ),
        (
            "llm.api_key",
            llm_api_key,
            source("llm.api_key", &["INTAKE_LLM_API_KEY", "GROQ_API_KEY"]),
        ),
        (
            "llm.base_url",
            config.llm.effective_base_url().to_string(),
            source("llm.base_url", &["INTAKE_LLM_BASE_URL"]),
        ),
        (
            "llm.chat_model",
            config.llm.chat_model.clone(),
            source("llm.chat_model", &["INTAKE_LLM_CHAT_MODEL"]),
        ),
        (
            "llm.drafting_model",
            config.llm.drafting_model.clone(),
            source("llm.drafting_model", &["INTAKE_LLM_DRAFTING_MODEL"]),
        ),
        (
            "llm.timeout_secs",
            config.llm.timeout_secs.to_string(),
            source("llm.timeout_secs", &["INTAKE_LLM_TIMEOUT_SECS"]),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["INTAKE_SERVER_BIND_ADDRESS"]),
        ),
        (
            "server.port",
            config.server.port.to_string(),
            source("server.port", &["INTAKE_SERVER_PORT"]),
        ),
        (
            "documents.config_dir",
            config.documents.config_dir.display().to_string(),
            source("documents.config_dir", &["INTAKE_DOCUMENTS_CONFIG_DIR"]),
        ),
        (
            "documents.template_dir",
            config.documents.template_dir.display().to_string(),
            source("documents.template_dir", &["INTAKE_DOCUMENTS_TEMPLATE_DIR"]),
        ),
        (
            "documents.static_dir",
            config.documents.static_dir.display().to_string(),
            source("documents.static_dir", &["INTAKE_DOCUMENTS_STATIC_DIR"]),
        ),
        (
            "session.idle_timeout_secs",
            config.session.idle_timeout_secs.to_string(),
            source("session.idle_timeout_secs", &["INTAKE_SESSION_IDLE_TIMEOUT_SECS"]),
        ),
        (
            "session.sweep_interval_secs",
            config.session.sweep_interval_secs.to_string(),
            source("session.sweep_interval_secs", &["INTAKE_SESSION_SWEEP_INTERVAL_SECS"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["INTAKE_LOGGING_LEVEL", "INTAKE_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            source("logging.format", &["INTAKE_LOGGING_FORMAT", "INTAKE_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("intake.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/intake.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a provider prefix such as `gsk_` or `sk-` so operators can tell
/// which key is loaded without exposing it.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['-', '_']) {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}
