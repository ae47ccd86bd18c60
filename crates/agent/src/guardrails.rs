use intake_core::GuardrailRules;
use serde::Serialize;

pub const INJECTION_REFUSAL: &str = "⚠️ I'm unable to process that request. \
I can only help you collect information for your legal document.";

pub const ADVICE_REFUSAL: &str = "I'm not able to provide legal advice. \
I can only help collect information for your document. \
Please consult a qualified solicitor for legal guidance.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    PromptInjection,
    AdviceRequest,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptInjection => "prompt_injection",
            Self::AdviceRequest => "advice_request",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PromptInjection => INJECTION_REFUSAL,
            Self::AdviceRequest => ADVICE_REFUSAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Block { reason: BlockReason, user_message: String },
}

impl GuardrailDecision {
    fn block(reason: BlockReason) -> Self {
        Self::Block { reason, user_message: reason.user_message().to_string() }
    }
}

/// Pre-engine filter over inbound user messages.
///
/// Matching is lower-cased substring containment. Injection patterns are
/// checked before advice keywords and the first matching category decides the
/// refusal. Blank patterns are dropped at construction, so an empty rule set
/// always allows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuardrailGate {
    injection_patterns: Vec<String>,
    advice_keywords: Vec<String>,
    vague_keywords: Vec<String>,
}

impl GuardrailGate {
    pub fn from_rules(rules: &GuardrailRules) -> Self {
        Self {
            injection_patterns: normalize_patterns(&rules.injection_patterns),
            advice_keywords: normalize_patterns(&rules.advice_keywords),
            vague_keywords: normalize_patterns(&rules.vague_keywords),
        }
    }

    pub fn check(&self, message: &str) -> GuardrailDecision {
        let normalized = message.to_lowercase();

        if contains_any(&normalized, &self.injection_patterns) {
            return GuardrailDecision::block(BlockReason::PromptInjection);
        }
        if contains_any(&normalized, &self.advice_keywords) {
            return GuardrailDecision::block(BlockReason::AdviceRequest);
        }

        GuardrailDecision::Allow
    }

    /// Diagnostic only: flags values like "not sure" or "something" that a
    /// reviewer may want to revisit. Never blocks a turn.
    pub fn is_vague(&self, value: &str) -> bool {
        contains_any(&value.to_lowercase(), &self.vague_keywords)
    }
}

fn normalize_patterns(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|pattern| pattern.to_lowercase())
        .filter(|pattern| !pattern.trim().is_empty())
        .collect()
}

fn contains_any(haystack: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| haystack.contains(pattern.as_str()))
}
