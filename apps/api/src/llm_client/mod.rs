//! LLM Client — the single point of entry for completion-service calls.
//!
//! ARCHITECTURAL RULE: No other module may call the completion API directly.
//!
//! Speaks the OpenAI-compatible chat completions protocol served by Groq.
//! Every call is one non-streaming request. Nothing here retries: a failure
//! is classified and handed back to the pipeline, which owns the fallback.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AnalysisServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited by completion service: {message}")]
    RateLimited { message: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

impl AnalysisServiceError {
    /// HTTP status reported by the completion service, when it answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::MalformedResponse(_) => None,
        }
    }
}

/// Generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Always false: streamed chunks cannot be parsed downstream.
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The seam between the pipeline and the hosted model.
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends `prompt` as a single user message and returns the raw text of
    /// the first choice.
    async fn complete(
        &self,
        prompt: &str,
        params: &ModelParams,
    ) -> Result<String, AnalysisServiceError>;
}

/// HTTP client for the hosted completion service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String, endpoint: String) -> Result<Self, AnalysisServiceError> {
        // No request timeout here; reqwest's defaults apply.
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &ModelParams,
    ) -> Result<String, AnalysisServiceError> {
        let request_body = ChatRequest {
            model: &params.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Try to parse error message
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AnalysisServiceError::RateLimited { message });
            }
            return Err(AnalysisServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AnalysisServiceError::MalformedResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Completion succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        first_choice_text(parsed)
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String, AnalysisServiceError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisServiceError::MalformedResponse("no choices returned".into()))?
        .message
        .content
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AnalysisServiceError::MalformedResponse(
            "first choice has no content".into(),
        ));
    }
    Ok(content)
}
