use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::InferenceProvider;

/// Client for the Hugging Face inference router (OpenAI-compatible chat completions)
#[derive(Debug)]
pub struct HfInference {
    /// HTTP client for API requests
    client: Client,
    /// Router base URL
    endpoint: String,
}

/// Chat message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Chat-completion request
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    /// Model identifier, e.g. "deepseek-ai/DeepSeek-V3"
    pub model: String,

    /// Inference provider the router should use, e.g. "fireworks-ai"
    pub provider: Option<String>,

    /// The messages for the conversation
    pub messages: Vec<ChatMessage>,

    /// Temperature for generation
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate
    pub max_tokens: u32,

    /// Top probability mass to consider (nucleus sampling)
    pub top_p: Option<f32>,
}

impl ChatCompletionRequest {
    /// Create a new request with the engine's deterministic sampling defaults
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider: None,
            messages: Vec::new(),
            temperature: Some(0.0),
            max_tokens: 1024,
            top_p: Some(0.3),
        }
    }

    /// Route the request through a named provider
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the top_p (nucleus sampling)
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Model id as the router expects it (`model:provider` when a provider is pinned)
    pub fn routed_model(&self) -> String {
        match &self.provider {
            Some(provider) => format!("{}:{}", self.model, provider),
            None => self.model.clone(),
        }
    }
}

/// Wire body: the request with the provider folded into the model id
#[derive(Serialize)]
struct RoutedRequest<'a> {
    model: String,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl<'a> From<&'a ChatCompletionRequest> for RoutedRequest<'a> {
    fn from(request: &'a ChatCompletionRequest) -> Self {
        Self {
            model: request.routed_model(),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
        }
    }
}

/// Message returned inside a choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// A single completion choice
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: ResponseMessage,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat-completion response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl ChatCompletionResponse {
    /// Build a response holding a single assistant message
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                },
            }],
            usage: None,
        }
    }

    /// Content of the first choice, or an empty string
    pub fn text(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

impl HfInference {
    /// Create a new client for the router at `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl InferenceProvider for HfInference {
    async fn chat_completion(
        &self,
        token: &str,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let body = RoutedRequest::from(&request);
        debug!("Sending chat completion for {}", body.model);

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Inference API error ({}): {}", status, error_text);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthenticationError(error_text)
                }
                _ => ProviderError::ApiError {
                    status_code: status.as_u16(),
                    message: error_text,
                },
            });
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}
