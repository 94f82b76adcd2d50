//! Reasoning providers
//!
//! The arbiter talks to an external reasoning backend through
//! [`ReasoningProvider`]. The concrete backend is chosen once, when the
//! arbiter is built.

use std::time::Duration;

use async_trait::async_trait;
use fallwatch_core::{FallwatchError, FallwatchResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// External reasoning backend
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Model identifier reported on arbiter results
    fn model(&self) -> &str;

    /// Produce a completion for the prompt
    async fn generate(&self, prompt: &str) -> FallwatchResult<String>;
}

/// Deterministic keyword-driven backend for tests and offline runs
#[derive(Clone, Debug)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub const DEFAULT_MODEL: &'static str = "gpt-mock";

    pub fn new() -> Self {
        MockProvider {
            model: Self::DEFAULT_MODEL.to_string(),
        }
    }

    fn respond(prompt: &str) -> serde_json::Value {
        let prompt = prompt.to_lowercase();
        if prompt.contains("major fall") || prompt.contains("unconscious") {
            json!({
                "recommendation": "NOTIFY_CAREGIVER",
                "risk_level": "critical",
                "confidence": 0.95,
                "reasoning": "Mock critical fall detected (provider).",
                "uncertainty_flags": [],
                "notes": "Simulated critical response."
            })
        } else if prompt.contains("recovering") {
            json!({
                "recommendation": "MONITOR",
                "risk_level": "medium",
                "confidence": 0.8,
                "reasoning": "Mock recovery detected (provider).",
                "uncertainty_flags": [],
                "notes": "Simulated monitor response."
            })
        } else {
            json!({
                "recommendation": "REQUEST_CONFIRMATION",
                "risk_level": "low",
                "confidence": 0.6,
                "reasoning": "Mock ambiguous situation (provider).",
                "uncertainty_flags": ["ambiguous_posture"],
                "notes": "Default mock response."
            })
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReasoningProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> FallwatchResult<String> {
        Ok(Self::respond(prompt).to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions backend
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> FallwatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FallwatchError::ProviderTransport(e.to_string()))?;
        Ok(OpenAiProvider {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReasoningProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> FallwatchResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "system",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FallwatchError::ProviderTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), model = %self.model, "reasoning backend rejected request");
            return Err(FallwatchError::ProviderStatus(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| FallwatchError::UnparseableResponse(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(FallwatchError::EmptyResponse)?;

        debug!(model = %self.model, bytes = content.len(), "reasoning backend answered");
        Ok(content)
    }
}
