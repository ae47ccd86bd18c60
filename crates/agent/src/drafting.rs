//! Document assembly.
//!
//! Two passes over the same template: a deterministic placeholder fill used
//! to report which fields are still missing, and a drafting-model call that
//! produces the final text from the collected data.

use std::sync::{Arc, OnceLock};

use chrono::{Local, NaiveDate};
use intake_core::{ApplicationError, CollectedData, ConversationTurn, FieldValue, TemplateProvider};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::info;

use crate::llm::{CompletionRequest, LlmClient};

pub const NOT_SPECIFIED: &str = "Not specified";
pub const DRAFTING_METHOD: &str = "llm_drafted";

const DRAFTING_TEMPERATURE: f32 = 0.0;
const DRAFTING_MAX_TOKENS: u32 = 2000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DraftedDocument {
    pub document: String,
    pub missing_fields: Vec<String>,
    pub collected_data: CollectedData,
    pub method: &'static str,
}

pub struct DocumentDrafter {
    templates: Arc<dyn TemplateProvider>,
    llm: Arc<dyn LlmClient>,
}

impl DocumentDrafter {
    pub fn new(templates: Arc<dyn TemplateProvider>, llm: Arc<dyn LlmClient>) -> Self {
        Self { templates, llm }
    }

    pub async fn generate(
        &self,
        doc_type: &str,
        collected: &CollectedData,
    ) -> Result<DraftedDocument, ApplicationError> {
        self.generate_on(doc_type, collected, Local::now().date_naive()).await
    }

    pub async fn generate_on(
        &self,
        doc_type: &str,
        collected: &CollectedData,
        today: NaiveDate,
    ) -> Result<DraftedDocument, ApplicationError> {
        let template = self.templates.load_template(doc_type)?;
        let missing_fields = missing_placeholders(&fill_template(&template, collected));

        let request = CompletionRequest {
            system: Some(drafting_system_prompt(today)),
            messages: vec![ConversationTurn::user(drafting_user_prompt(collected, &template))],
            temperature: DRAFTING_TEMPERATURE,
            max_tokens: DRAFTING_MAX_TOKENS,
        };
        let document = self.llm.complete(&request).await?.trim().to_string();

        info!(
            event_name = "intake.document.drafted",
            doc_type = %doc_type,
            missing_fields = missing_fields.len(),
            document_chars = document.len(),
            "document drafted"
        );

        Ok(DraftedDocument {
            document,
            missing_fields,
            collected_data: collected.clone(),
            method: DRAFTING_METHOD,
        })
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid"))
}

/// Replaces every `{{name}}` that has a collected value. Unknown placeholders
/// are left in place.
pub fn fill_template(template: &str, collected: &CollectedData) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures<'_>| match collected.get(&caps[1]) {
            Some(value) => render_value(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn render_value(value: &FieldValue) -> String {
    if !value.is_specified() {
        return NOT_SPECIFIED.to_string();
    }
    match value {
        FieldValue::Text(text) => text.clone(),
        FieldValue::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| format!("  {}. {item}", index + 1))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Placeholder names still present in `text`, first occurrence order.
pub fn missing_placeholders(text: &str) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for caps in placeholder_pattern().captures_iter(text) {
        let name = &caps[1];
        if !missing.iter().any(|existing| existing == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

fn drafting_system_prompt(today: NaiveDate) -> String {
    format!(
        "You are a legal document drafting assistant. Today's date is {}.\n\n\
         Draft the document using the template as a guide for structure and wording.\n\n\
         RULES:\n\
         - Use ONLY the information provided in the collected data\n\
         - Do NOT give legal advice or add commentary\n\
         - Do NOT invent clauses, names, amounts or dates that were not provided\n\
         - Present lists as numbered items\n\
         - Where a value is missing, empty or \"N/A\", write \"Not specified\"\n\
         - Output ONLY the document text, with no preamble or closing remarks",
        today.format("%d %B %Y")
    )
}

fn drafting_user_prompt(collected: &CollectedData, template: &str) -> String {
    let data = serde_json::to_string_pretty(collected).unwrap_or_default();
    format!("Collected data:\n{data}\n\nTemplate:\n{template}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use intake_core::{
        ApplicationError, CatalogError, CollectedData, EngineError, FieldValue, TemplateProvider,
    };
    use serde_json::json;

    use super::{fill_template, missing_placeholders, DocumentDrafter, DRAFTING_METHOD};
    use crate::llm::testing::ScriptedLlm;

    struct InMemoryTemplates(HashMap<String, String>);

    impl TemplateProvider for InMemoryTemplates {
        fn load_template(&self, doc_type: &str) -> Result<String, CatalogError> {
            self.0
                .get(doc_type)
                .cloned()
                .ok_or_else(|| CatalogError::TemplateNotFound { doc_type: doc_type.to_string() })
        }
    }

    fn templates(template: &str) -> Arc<InMemoryTemplates> {
        Arc::new(InMemoryTemplates(HashMap::from([("will".to_string(), template.to_string())])))
    }

    fn data(entries: &[(&str, FieldValue)]) -> CollectedData {
        entries.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
    }

    #[test]
    fn fills_scalars_and_numbers_list_items() {
        let collected = data(&[
            ("name", FieldValue::from("John Smith")),
            ("beneficiaries", FieldValue::from(vec!["Jane", "Bob"])),
        ]);

        let filled = fill_template("Name: {{name}}\nBeneficiaries:\n{{beneficiaries}}", &collected);

        assert_eq!(filled, "Name: John Smith\nBeneficiaries:\n  1. Jane\n  2. Bob");
        assert!(missing_placeholders(&filled).is_empty());
    }

    #[test]
    fn unfilled_placeholders_are_reported_once_in_order() {
        let collected = data(&[("name", FieldValue::from("Ann"))]);

        let filled =
            fill_template("{{name}} {{unfilled}} {{executor}} {{unfilled}}", &collected);

        assert_eq!(filled, "Ann {{unfilled}} {{executor}} {{unfilled}}");
        assert_eq!(missing_placeholders(&filled), vec!["unfilled", "executor"]);
    }

    #[test]
    fn empty_values_render_as_not_specified() {
        let collected = data(&[("guardian", FieldValue::from(""))]);
        assert_eq!(fill_template("Guardian: {{guardian}}", &collected), "Guardian: Not specified");
    }

    #[test]
    fn falsy_extracted_values_render_as_not_specified() {
        let collected = data(&[
            ("minors", FieldValue::from_json(json!(false))),
            ("children", FieldValue::from_json(json!(0))),
            ("pets", FieldValue::from_json(json!(null))),
        ]);

        let filled = fill_template(
            "Minors: {{minors}} Children: {{children}} Pets: {{pets}}",
            &collected,
        );

        assert_eq!(filled, "Minors: Not specified Children: Not specified Pets: Not specified");
        assert!(missing_placeholders(&filled).is_empty());
    }

    #[tokio::test]
    async fn generate_drafts_with_the_drafting_model_and_reports_missing() {
        let llm = Arc::new(ScriptedLlm::new().extract("\n  LAST WILL OF ANN  \n"));
        let drafter =
            DocumentDrafter::new(templates("Testator: {{name}}\nExecutor: {{executor}}"), llm.clone());
        let collected = data(&[("name", FieldValue::from("Ann"))]);

        let drafted = drafter.generate_on("will", &collected, today()).await.expect("drafted");

        assert_eq!(drafted.document, "LAST WILL OF ANN");
        assert_eq!(drafted.missing_fields, vec!["executor"]);
        assert_eq!(drafted.collected_data, collected);
        assert_eq!(drafted.method, DRAFTING_METHOD);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 2000);
        let system = requests[0].system.clone().unwrap_or_default();
        assert!(system.contains("19 October 2026"));
        assert!(system.contains("Do NOT give legal advice"));
        let user = &requests[0].messages[0].content;
        assert!(user.contains("\"name\": \"Ann\""));
        assert!(user.contains("Executor: {{executor}}"));
    }

    #[tokio::test]
    async fn missing_template_is_not_found_without_engine_call() {
        let llm = Arc::new(ScriptedLlm::new());
        let drafter = DocumentDrafter::new(templates("x"), llm.clone());

        let result = drafter.generate_on("lease", &CollectedData::new(), today()).await;

        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn engine_failure_is_surfaced() {
        let llm = Arc::new(ScriptedLlm::new().fail_extraction(EngineError::Authentication));
        let drafter = DocumentDrafter::new(templates("{{name}}"), llm);

        let result = drafter.generate_on("will", &CollectedData::new(), today()).await;

        assert_eq!(result, Err(ApplicationError::Engine(EngineError::Authentication)));
    }
}
