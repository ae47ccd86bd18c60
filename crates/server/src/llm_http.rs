//! Generation-engine client for OpenAI-compatible chat completion APIs.
//!
//! Groq, OpenAI and Ollama all accept the same `POST {base}/chat/completions`
//! shape, so one client covers every configured provider. Requests are sent
//! once; there are no retries at this layer.

use std::time::Duration;

use async_trait::async_trait;
use intake_agent::{CompletionRequest, LlmClient};
use intake_core::config::LlmConfig;
use intake_core::EngineError;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig, model: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<Response, EngineError> {
        let mut request = self.client.post(self.completions_url()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        request.send().await.map_err(|error| {
            if error.is_timeout() {
                EngineError::Timeout { timeout_secs: self.timeout_secs }
            } else if error.is_connect() {
                EngineError::Transport(format!("connection failed: {error}"))
            } else {
                EngineError::Transport(error.to_string())
            }
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, EngineError> {
        let body = to_chat_request(&self.model, request);
        let response = self.send(&body).await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), error_body));
        }

        let payload = response.text().await.map_err(|error| {
            EngineError::MalformedResponse(format!("could not read response body: {error}"))
        })?;
        let content = parse_chat_response(&payload)?;

        debug!(
            event_name = "intake.engine.completed",
            model = %self.model,
            reply_chars = content.len(),
            "generation engine call completed"
        );
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn to_chat_request<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage { role: "system", content: system });
    }
    messages.extend(
        request
            .messages
            .iter()
            .map(|turn| ChatMessage { role: turn.role.as_str(), content: &turn.content }),
    );

    ChatRequest {
        model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn status_error(status: u16, body: String) -> EngineError {
    match status {
        401 | 403 => EngineError::Authentication,
        429 => EngineError::RateLimited(body),
        _ => EngineError::Status { status, body },
    }
}

fn parse_chat_response(payload: &str) -> Result<String, EngineError> {
    let response: ChatResponse = serde_json::from_str(payload).map_err(|error| {
        EngineError::MalformedResponse(format!("failed to parse response: {error}"))
    })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| EngineError::MalformedResponse("no choices in response".to_string()))
}
