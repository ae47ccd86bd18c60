use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailRules {
    #[serde(default)]
    pub injection_patterns: Vec<String>,
    #[serde(default)]
    pub advice_keywords: Vec<String>,
    #[serde(default)]
    pub vague_keywords: Vec<String>,
}

/// Definition of one document type: what to collect and how to talk about it.
///
/// Read once when a session starts and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocConfig {
    pub document_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Prompt template; `{fields}` and `{collected}` are substituted per turn.
    #[serde(alias = "system_prompt_template")]
    pub system_prompt: String,
    #[serde(default)]
    pub required_fields: Vec<FieldSpec>,
    #[serde(default)]
    pub guardrails: GuardrailRules,
}

impl DocConfig {
    pub fn display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.document_type
        } else {
            &self.display_name
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        self.required_fields.iter().map(|field| field.name.clone()).collect()
    }

    pub fn total_fields(&self) -> usize {
        self.required_fields.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocTypeSummary {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub display_name: String,
    pub description: String,
}
