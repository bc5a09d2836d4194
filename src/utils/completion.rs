use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::settings::Settings;
use super::types::ModelChoice;

// ============================================================================
// Constants
// ============================================================================

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("error sending request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("error decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no {0} in response")]
    EmptyResponse(&'static str),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("{0}")]
    Provider(String),
}

/// Anything that can turn a prompt into a completion.
///
/// The caching flag is passed through untouched; what it means is up to the
/// implementation.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        model: ModelChoice,
        prompt: &str,
        use_caching: bool,
    ) -> Result<String, CompletionError>;
}

// ============================================================================
// API Types - Anthropic
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: AnthropicContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub content: Vec<AnthropicReplyBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicReplyBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

// ============================================================================
// API Types - OpenAI
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: OpenAiReplyMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
}

// ============================================================================
// Request / Response shaping
// ============================================================================

pub fn anthropic_request(
    model: &str,
    max_tokens: u32,
    prompt: &str,
    use_caching: bool,
) -> AnthropicRequest {
    let content = if use_caching {
        AnthropicContent::Blocks(vec![ContentBlock {
            kind: "text".to_string(),
            text: prompt.to_string(),
            cache_control: Some(CacheControl {
                kind: "ephemeral".to_string(),
            }),
        }])
    } else {
        AnthropicContent::Text(prompt.to_string())
    };

    AnthropicRequest {
        model: model.to_string(),
        max_tokens,
        messages: vec![AnthropicMessage {
            role: "user".to_string(),
            content,
        }],
    }
}

pub fn openai_request(model: &str, prompt: &str) -> OpenAiRequest {
    OpenAiRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(prompt)],
    }
}

pub fn parse_anthropic_reply(body: &str) -> Result<String, CompletionError> {
    let response: AnthropicResponse = serde_json::from_str(body)?;
    // Other block kinds (tool use, thinking) can come first.
    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or(CompletionError::EmptyResponse("content"))
}

pub fn parse_openai_reply(body: &str) -> Result<String, CompletionError> {
    let response: OpenAiResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(CompletionError::Provider(error.message));
    }
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or(CompletionError::EmptyResponse("choices"))
}

/// Pull `error.message` out of a provider error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Environment wins over the settings file; empty values count as unset.
pub fn resolve_api_key(from_env: Option<String>, from_settings: Option<&str>) -> Option<String> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| {
            from_settings
                .filter(|key| !key.trim().is_empty())
                .map(str::to_string)
        })
}

// ============================================================================
// Provider Client
// ============================================================================

#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
    anthropic_key: Option<String>,
    anthropic_base_url: String,
    anthropic_model: String,
    anthropic_max_tokens: u32,
    openai_key: Option<String>,
    openai_base_url: String,
    openai_model: String,
}

impl ProviderClient {
    pub fn new(settings: &Settings) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client,
            anthropic_key: resolve_api_key(
                std::env::var(ANTHROPIC_KEY_VAR).ok(),
                settings.anthropic_api_key.as_deref(),
            ),
            anthropic_base_url: settings.anthropic_base_url.trim_end_matches('/').to_string(),
            anthropic_model: settings.anthropic_model.clone(),
            anthropic_max_tokens: settings.anthropic_max_tokens,
            openai_key: resolve_api_key(
                std::env::var(OPENAI_KEY_VAR).ok(),
                settings.openai_api_key.as_deref(),
            ),
            openai_base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            openai_model: settings.openai_model.clone(),
        })
    }

    async fn post_json<T: Serialize>(
        &self,
        request: reqwest::RequestBuilder,
        body: &T,
    ) -> Result<String, CompletionError> {
        let response = request
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), body_len = text.len(), "provider responded");

        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(text)
    }

    async fn complete_anthropic(
        &self,
        prompt: &str,
        use_caching: bool,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .anthropic_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey(ANTHROPIC_KEY_VAR))?;

        let body = anthropic_request(
            &self.anthropic_model,
            self.anthropic_max_tokens,
            prompt,
            use_caching,
        );
        let url = format!("{}/v1/messages", self.anthropic_base_url);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let text = self.post_json(request, &body).await?;
        parse_anthropic_reply(&text)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .openai_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey(OPENAI_KEY_VAR))?;

        let body = openai_request(&self.openai_model, prompt);
        let url = format!("{}/v1/chat/completions", self.openai_base_url);

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key));

        let text = self.post_json(request, &body).await?;
        parse_openai_reply(&text)
    }
}

#[async_trait]
impl CompletionBackend for ProviderClient {
    async fn complete(
        &self,
        model: ModelChoice,
        prompt: &str,
        use_caching: bool,
    ) -> Result<String, CompletionError> {
        // Prompt contents are never logged, only their size.
        tracing::info!(
            model = %model,
            prompt_len = prompt.len(),
            use_caching,
            "requesting completion"
        );

        match model {
            ModelChoice::Claude => self.complete_anthropic(prompt, use_caching).await,
            ModelChoice::ChatGpt => {
                if use_caching {
                    tracing::debug!("OpenAI applies prompt caching automatically");
                }
                self.complete_openai(prompt).await
            }
        }
    }
}
