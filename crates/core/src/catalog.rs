//! Document-type catalog.
//!
//! Each document type is a pair of files sharing a stem:
//! - `<config_dir>/<doc_type>.toml` - the [`DocConfig`] (fields, prompt, guardrails)
//! - `<template_dir>/<doc_type>.txt` - the document template with `{{field}}` placeholders
//!
//! Adding a document type means dropping those two files in place; no code changes.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::domain::document::{DocConfig, DocTypeSummary};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("document type `{doc_type}` not found")]
    DocTypeNotFound { doc_type: String },
    #[error("template for document type `{doc_type}` not found")]
    TemplateNotFound { doc_type: String },
    #[error("invalid document type identifier `{0}`")]
    InvalidDocType(String),
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse `{path}`: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

pub trait ConfigProvider: Send + Sync {
    fn load_config(&self, doc_type: &str) -> Result<DocConfig, CatalogError>;
    fn list_doc_types(&self) -> Vec<DocTypeSummary>;
}

pub trait TemplateProvider: Send + Sync {
    fn load_template(&self, doc_type: &str) -> Result<String, CatalogError>;
}

#[derive(Clone, Debug)]
pub struct FileCatalog {
    config_dir: PathBuf,
    template_dir: PathBuf,
}

impl FileCatalog {
    pub fn new(config_dir: impl Into<PathBuf>, template_dir: impl Into<PathBuf>) -> Self {
        Self { config_dir: config_dir.into(), template_dir: template_dir.into() }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    fn config_path(&self, doc_type: &str) -> PathBuf {
        self.config_dir.join(format!("{doc_type}.toml"))
    }

    fn template_path(&self, doc_type: &str) -> PathBuf {
        self.template_dir.join(format!("{doc_type}.txt"))
    }

    fn doc_type_stems(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.config_dir) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    event_name = "intake.catalog.config_dir_unreadable",
                    config_dir = %self.config_dir.display(),
                    error = %error,
                    "document type directory could not be read"
                );
                return Vec::new();
            }
        };

        let mut stems = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect::<Vec<_>>();
        stems.sort();
        stems
    }
}

impl ConfigProvider for FileCatalog {
    fn load_config(&self, doc_type: &str) -> Result<DocConfig, CatalogError> {
        validate_doc_type(doc_type)?;
        let path = self.config_path(doc_type);
        if !path.exists() {
            return Err(CatalogError::DocTypeNotFound { doc_type: doc_type.to_string() });
        }

        let raw = fs::read_to_string(&path)
            .map_err(|source| CatalogError::Read { path: path.clone(), source })?;
        toml::from_str::<DocConfig>(&raw).map_err(|source| CatalogError::Parse { path, source })
    }

    fn list_doc_types(&self) -> Vec<DocTypeSummary> {
        self.doc_type_stems()
            .into_iter()
            .filter_map(|stem| match self.load_config(&stem) {
                Ok(config) => Some(DocTypeSummary {
                    display_name: config.display_name().to_string(),
                    description: config.description.clone(),
                    doc_type: stem,
                }),
                Err(error) => {
                    warn!(
                        event_name = "intake.catalog.doc_type_skipped",
                        doc_type = %stem,
                        error = %error,
                        "skipping document type that failed to load"
                    );
                    None
                }
            })
            .collect()
    }
}

impl TemplateProvider for FileCatalog {
    fn load_template(&self, doc_type: &str) -> Result<String, CatalogError> {
        validate_doc_type(doc_type)?;
        let path = self.template_path(doc_type);
        if !path.exists() {
            return Err(CatalogError::TemplateNotFound { doc_type: doc_type.to_string() });
        }

        fs::read_to_string(&path).map_err(|source| CatalogError::Read { path, source })
    }
}

/// Identifiers map straight onto file names, so only a conservative
/// character set is accepted.
pub fn validate_doc_type(doc_type: &str) -> Result<(), CatalogError> {
    let valid = !doc_type.is_empty()
        && doc_type.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidDocType(doc_type.to_string()))
    }
}
