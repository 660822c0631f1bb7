use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{SpaceClient, SpaceConnector};

const HUB_API: &str = "https://huggingface.co/api/spaces";

/// Arguments of a Space chat endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    /// User message
    pub message: String,
    /// System message
    pub system_message: String,
    /// Maximum number of new tokens
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Top probability mass to consider (nucleus sampling)
    pub top_p: f32,
    /// Additional positional inputs some proxied Spaces expect after the standard ones
    pub extra: Vec<(String, Value)>,
}

impl PredictRequest {
    /// Create a request with the engine's deterministic sampling defaults
    pub fn new(message: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_message: system_message.into(),
            max_tokens: 2048,
            temperature: 0.0,
            top_p: 0.1,
            extra: Vec::new(),
        }
    }

    /// Append a named extra input
    pub fn extra(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.push((name.into(), value));
        self
    }

    /// Positional `data` array in the order the chat endpoints declare their inputs
    pub fn to_data(&self) -> Vec<Value> {
        let mut data = vec![
            json!(self.message),
            json!(self.system_message),
            json!(self.max_tokens),
            json!(self.temperature),
            json!(self.top_p),
        ];
        data.extend(self.extra.iter().map(|(_, v)| v.clone()));
        data
    }
}

/// Result of a predict call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictResponse {
    /// Output values, one per endpoint output
    #[serde(default)]
    pub data: Vec<Value>,
}

impl PredictResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            data: vec![Value::String(text.into())],
        }
    }

    /// The whole response as JSON, `{"data": [...]}`
    pub fn to_value(&self) -> Value {
        json!({ "data": self.data })
    }
}

#[derive(Debug, Deserialize)]
struct HostInfo {
    host: String,
}

#[derive(Debug, Deserialize)]
struct SpaceConfig {
    #[serde(default)]
    api_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventId {
    event_id: String,
}

/// Connector that opens Gradio Spaces over HTTP
#[derive(Debug, Clone)]
pub struct GradioSpaces {
    client: Client,
}

impl GradioSpaces {
    /// Create a new connector whose HTTP calls are bounded by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Direct `*.hf.space` address derived from `owner/name`
    pub fn default_host(space: &str) -> String {
        let subdomain: String = space
            .chars()
            .map(|c| match c {
                '/' | '.' | '_' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        format!("https://{}.hf.space", subdomain)
    }

    async fn resolve_host(&self, space: &str, token: Option<&str>) -> String {
        let request = with_token(self.client.get(format!("{}/{}/host", HUB_API, space)), token);
        let resolved = match request.send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<HostInfo>().await.ok().map(|info| info.host)
            }
            _ => None,
        };
        resolved.unwrap_or_else(|| Self::default_host(space))
    }
}

#[async_trait]
impl SpaceConnector for GradioSpaces {
    async fn connect(
        &self,
        space: &str,
        token: Option<&str>,
    ) -> Result<Arc<dyn SpaceClient>, ProviderError> {
        let host = self.resolve_host(space, token).await;
        let root = Url::parse(&host)
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid host {}: {}", host, e)))?;

        let response = with_token(self.client.get(join(&root, "config")), token)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::AuthenticationError(format!("Space {} refused the token", space))
                }
                _ => ProviderError::ConnectionError(format!(
                    "Space {} is not available ({})",
                    space, status
                )),
            });
        }

        let config = response
            .json::<SpaceConfig>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        info!("Connected to space {} at {}", space, root);
        Ok(Arc::new(GradioSpaceClient {
            client: self.client.clone(),
            root,
            api_prefix: config.api_prefix.unwrap_or_default(),
            token: token.map(str::to_string),
        }))
    }
}

/// An open Gradio Space
#[derive(Debug)]
pub struct GradioSpaceClient {
    client: Client,
    root: Url,
    api_prefix: String,
    token: Option<String>,
}

impl GradioSpaceClient {
    fn call_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/call/{}",
            self.root.as_str().trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl SpaceClient for GradioSpaceClient {
    async fn predict(
        &self,
        endpoint: &str,
        request: PredictRequest,
    ) -> Result<PredictResponse, ProviderError> {
        let url = self.call_url(endpoint);
        debug!("Calling {}", url);

        let response = with_token(self.client.post(&url), self.token.as_deref())
            .json(&json!({ "data": request.to_data() }))
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Space call failed ({}): {}", status, message);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let event = response
            .json::<EventId>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let stream = with_token(
            self.client.get(format!("{}/{}", url, event.event_id)),
            self.token.as_deref(),
        )
        .send()
        .await
        .map_err(|e| ProviderError::RequestFailed(e.to_string()))?
        .text()
        .await
        .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        parse_event_stream(&stream)
    }
}

fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn join(root: &Url, path: &str) -> String {
    format!("{}/{}", root.as_str().trim_end_matches('/'), path)
}

/// Read the server-sent events of a call and return the `complete` payload
pub fn parse_event_stream(stream: &str) -> Result<PredictResponse, ProviderError> {
    let mut event = "";
    for line in stream.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    let values: Vec<Value> = serde_json::from_str(data)
                        .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                    return Ok(PredictResponse { data: values });
                }
                "error" => {
                    return Err(ProviderError::ApiError {
                        status_code: 500,
                        message: if data == "null" {
                            "Space reported an error".to_string()
                        } else {
                            data.to_string()
                        },
                    });
                }
                _ => {}
            }
        }
    }
    Err(ProviderError::ParseError(
        "Event stream ended without a result".to_string(),
    ))
}
