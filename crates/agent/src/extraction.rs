use std::sync::Arc;

use intake_core::{CollectedData, ConversationTurn, EngineError, FieldValue};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmClient};

const EXTRACTION_TEMPERATURE: f32 = 0.0;
const EXTRACTION_MAX_TOKENS: u32 = 500;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("extraction reply contained no JSON object")]
    NoPayload,
    #[error("extraction reply was not a valid JSON object: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reconciles a transcript into confirmed field values using a strict,
/// deterministic engine call. Only values the user stated explicitly count.
#[derive(Clone)]
pub struct FieldExtractor {
    llm: Arc<dyn LlmClient>,
}

impl FieldExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn extract(
        &self,
        history: &[ConversationTurn],
        field_names: &[String],
    ) -> Result<CollectedData, ExtractionError> {
        if history.is_empty() {
            return Ok(CollectedData::new());
        }

        let request = CompletionRequest {
            system: None,
            messages: vec![ConversationTurn::user(build_extraction_prompt(history, field_names))],
            temperature: EXTRACTION_TEMPERATURE,
            max_tokens: EXTRACTION_MAX_TOKENS,
        };
        let raw = self.llm.complete(&request).await?;
        parse_extraction(&raw)
    }
}

pub fn build_extraction_prompt(history: &[ConversationTurn], field_names: &[String]) -> String {
    let transcript = serde_json::to_string_pretty(history).unwrap_or_default();
    let fields = serde_json::to_string(field_names).unwrap_or_default();

    format!(
        r#"Look at this conversation and extract ONLY values that the user has EXPLICITLY stated.

Conversation:
{transcript}

Fields to extract: {fields}

STRICT RULES:
- ONLY extract a field if the user directly said the value
- Do NOT infer, guess, or assume any values
- Do NOT extract anything the assistant said
- If unsure, leave the field out entirely
- Return ONLY a JSON object, nothing else

Example: if user said "my name is John", return {{"testator_name": "John"}}
If user said nothing about a field, do NOT include it."#
    )
}

/// Takes the span from the first `{` to the last `}` of the reply and reads it
/// as a JSON object of field values.
pub fn parse_extraction(raw: &str) -> Result<CollectedData, ExtractionError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(ExtractionError::NoPayload);
    };
    if end <= start {
        return Err(ExtractionError::NoPayload);
    }

    let payload = serde_json::from_str::<Map<String, Value>>(&raw[start..=end])?;
    Ok(payload.into_iter().map(|(key, value)| (key, FieldValue::from_json(value))).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use intake_core::{CollectedData, ConversationTurn, EngineError, FieldValue};

    use super::{build_extraction_prompt, parse_extraction, ExtractionError, FieldExtractor};
    use crate::llm::testing::ScriptedLlm;

    fn fields() -> Vec<String> {
        vec!["testator_name".to_string(), "beneficiaries".to_string()]
    }

    #[tokio::test]
    async fn extracts_explicitly_stated_name() {
        let llm = Arc::new(ScriptedLlm::new().extract(r#"{"testator_name": "John Smith"}"#));
        let extractor = FieldExtractor::new(llm.clone());
        let history = vec![ConversationTurn::user("My name is John Smith")];

        let extracted = extractor.extract(&history, &fields()).await.expect("extraction");

        let mut expected = CollectedData::new();
        expected.insert("testator_name".to_string(), FieldValue::from("John Smith"));
        assert_eq!(extracted, expected);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 500);
        assert!(requests[0].system.is_none());
        assert!(requests[0].messages[0].content.contains("My name is John Smith"));
    }

    #[tokio::test]
    async fn empty_history_skips_the_engine() {
        let llm = Arc::new(ScriptedLlm::new());
        let extractor = FieldExtractor::new(llm.clone());

        let extracted = extractor.extract(&[], &fields()).await.expect("extraction");

        assert!(extracted.is_empty());
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn same_history_yields_same_mapping() {
        let reply = r#"{"testator_name": "Jane Doe", "beneficiaries": ["Tom", "Ann"]}"#;
        let llm = Arc::new(ScriptedLlm::new().extract(reply).extract(reply));
        let extractor = FieldExtractor::new(llm.clone());
        let history = vec![
            ConversationTurn::user("I'm Jane Doe"),
            ConversationTurn::assistant("Thanks Jane. Who are your beneficiaries?"),
            ConversationTurn::user("Tom and Ann"),
        ];

        let first = extractor.extract(&history, &fields()).await.expect("first");
        let second = extractor.extract(&history, &fields()).await.expect("second");

        assert_eq!(first, second);
        let requests = llm.requests();
        assert_eq!(requests[0], requests[1]);
    }

    #[tokio::test]
    async fn engine_failure_surfaces_as_extraction_error() {
        let llm = Arc::new(ScriptedLlm::new().fail_extraction(EngineError::Authentication));
        let extractor = FieldExtractor::new(llm);
        let history = vec![ConversationTurn::user("hello")];

        let result = extractor.extract(&history, &fields()).await;

        assert!(matches!(result, Err(ExtractionError::Engine(EngineError::Authentication))));
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let extracted =
            parse_extraction("Sure! Here you go:\n```json\n{\"testator_name\": \"Ann\"}\n```")
                .expect("parse");
        assert_eq!(extracted.get("testator_name"), Some(&FieldValue::from("Ann")));
    }

    #[test]
    fn empty_object_is_an_empty_mapping() {
        assert!(parse_extraction("{}").expect("parse").is_empty());
    }

    #[test]
    fn reply_without_braces_has_no_payload() {
        assert!(matches!(parse_extraction("nothing confirmed"), Err(ExtractionError::NoPayload)));
        assert!(matches!(parse_extraction("} then {"), Err(ExtractionError::NoPayload)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            parse_extraction("{\"testator_name\": John}"),
            Err(ExtractionError::Parse(_))
        ));
    }

    #[test]
    fn keys_outside_the_schema_are_kept() {
        let extracted = parse_extraction(r#"{"pet_name": "Rex"}"#).expect("parse");
        assert_eq!(extracted.get("pet_name"), Some(&FieldValue::from("Rex")));
    }

    #[test]
    fn prompt_lists_fields_and_transcript() {
        let prompt = build_extraction_prompt(
            &[ConversationTurn::user("My name is John Smith")],
            &["testator_name".to_string()],
        );

        assert!(prompt.contains(r#"["testator_name"]"#));
        assert!(prompt.contains(r#""role": "user""#));
        assert!(prompt.contains("Do NOT extract anything the assistant said"));
        assert!(prompt.contains(r#"return {"testator_name": "John"}"#));
    }
}
