/*!
 * Core batch translation client.
 *
 * `BatchTranslationClient` is the engine the host talks to. One `fetch`
 * call routes the model, builds the prompts, sends them to a Space or the
 * inference router and maps the reply back onto the request, all or
 * nothing. Every failure leaves as a `TranslationFailure`.
 */

use log::{debug, error, info, warn};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{ProviderError, TranslationError, TranslationFailure};
use crate::providers::inference::{ChatCompletionRequest, HfInference};
use crate::providers::spaces::{GradioSpaces, PredictRequest};
use crate::providers::{InferenceProvider, SpaceConnector};

use super::connection::{ConnectionStatus, SpaceConnectionCache};
use super::parser::{parse_response, project_reply};
use super::prompts::PromptBuilder;
use super::router::{ModelRegistry, ModelRouter, Route};

/// Endpoint of the chat function on the Spaces
const CHAT_ENDPOINT: &str = "/chat";

/// Probe sent by `test_connection`
const PROBE_MESSAGE: &str = "Good evening.";
const PROBE_SYSTEM_MESSAGE: &str = "Be as fast as possible.";

/// One translation call: the texts, where to send them, and in which language
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub texts: Vec<String>,
    pub model: String,
    pub target_language: String,
}

/// Batching parameters the host reads when registering the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    /// Maximum number of texts per `fetch`
    pub max_request_length: usize,
    /// Pause between batches
    pub batch_delay: Duration,
    /// Model ids offered in the options form
    pub models: Vec<String>,
}

/// Translation engine for batches of texts
pub struct BatchTranslationClient {
    /// Options edited by the host form
    config: RwLock<Config>,

    /// Model routing
    router: ModelRouter,

    /// Chat-completion transport
    inference: Arc<dyn InferenceProvider>,

    /// Cached Space connection
    spaces: SpaceConnectionCache,

    /// Set after a credential failure; the host should stop retrying
    aborted: AtomicBool,
}

impl BatchTranslationClient {
    /// Create an engine with the HTTP transports and the builtin models
    pub fn new(config: Config) -> Self {
        let inference = Arc::new(HfInference::new(
            config.inference_endpoint.clone(),
            config.request_timeout(),
        ));
        let spaces = Arc::new(GradioSpaces::new(config.request_timeout()));
        Self::with_transports(
            config,
            Arc::new(ModelRegistry::builtin().clone()),
            inference,
            spaces,
        )
    }

    /// Create an engine with explicit registry and transports
    pub fn with_transports(
        config: Config,
        registry: Arc<ModelRegistry>,
        inference: Arc<dyn InferenceProvider>,
        connector: Arc<dyn SpaceConnector>,
    ) -> Self {
        let spaces = SpaceConnectionCache::new(connector, config.connect_timeout());
        Self {
            config: RwLock::new(config),
            router: ModelRouter::new(registry),
            inference,
            spaces,
            aborted: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current options
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    /// Batching parameters for the host
    pub fn descriptor(&self) -> EngineDescriptor {
        let config = self.config.read();
        EngineDescriptor {
            max_request_length: config.max_request_length,
            batch_delay: config.batch_delay(),
            models: self
                .router
                .registry()
                .model_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Apply an options-form change. A new credential lifts a previous abort.
    pub fn update_option(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let credential_changed = self.config.write().update_option(key, value)?;
        if credential_changed && self.aborted.swap(false, Ordering::SeqCst) {
            info!("Credentials updated, engine resumed");
        }
        Ok(())
    }

    /// Whether a credential failure asked the host to stop retrying
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Lifecycle state of the cached Space connection
    pub fn connection_status(&self) -> ConnectionStatus {
        self.spaces.status()
    }

    /// Translate `texts` with `model` (or the configured model).
    ///
    /// Returns exactly one translation per text, in order.
    pub async fn fetch(&self, texts: &[String], model: Option<&str>) -> Result<Vec<String>, TranslationFailure> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let config = self.config();
        let request = TranslationRequest {
            texts: texts.to_vec(),
            model: model.map_or_else(|| config.model_name.clone(), str::to_string),
            target_language: config.target_language.clone(),
        };

        let start_time = Instant::now();
        match self.translate(&request, &config).await {
            Ok(translations) => {
                info!(
                    "Translated {} texts with {} in {:?}",
                    translations.len(),
                    request.model,
                    start_time.elapsed()
                );
                Ok(translations)
            }
            Err(e) => {
                error!("Translation with {} failed: {}", request.model, e);
                let failure = TranslationFailure::from(e);
                if failure.kind.aborts_engine() {
                    warn!("Stopping automatic retries until the credential is configured");
                    self.aborted.store(true, Ordering::SeqCst);
                }
                Err(failure)
            }
        }
    }

    /// Send a short probe to `model` and return the raw reply
    pub async fn test_connection(&self, model: Option<&str>) -> Result<String, TranslationFailure> {
        let config = self.config();
        let model = model.unwrap_or(&config.model_name);

        self.probe(model, &config).await.map_err(|e| {
            error!("Connection test for {} failed: {}", model, e);
            TranslationFailure::from(e)
        })
    }

    async fn probe(&self, model: &str, config: &Config) -> Result<String, TranslationError> {
        let route = self.router.resolve_backend(model)?;
        let token = self.router.authorize(&route, config)?;
        self.send(&route, token.as_deref(), PROBE_SYSTEM_MESSAGE, PROBE_MESSAGE, config)
            .await
    }

    async fn translate(&self, request: &TranslationRequest, config: &Config) -> Result<Vec<String>, TranslationError> {
        // Routing and credentials are settled before any network call
        let route = self.router.resolve_backend(&request.model)?;
        let token = self.router.authorize(&route, config)?;

        let builder = PromptBuilder::new(&request.target_language);
        let (system_prompt, user_prompt) = builder.build(&request.texts);
        debug!("User prompt for {} texts:\n{}", request.texts.len(), user_prompt);

        let reply = self
            .send(&route, token.as_deref(), &system_prompt, &user_prompt, config)
            .await?;

        let expected = request.texts.len();
        let translations = parse_response(&reply, expected);
        if translations.len() != expected {
            warn!(
                "Recovered {} of {} items from {} reply",
                translations.len(),
                expected,
                route.model_id()
            );
            return Err(TranslationError::ParseMismatch {
                expected,
                actual: translations.len(),
                payload: reply,
            });
        }

        Ok(translations)
    }

    async fn send(
        &self,
        route: &Route,
        token: Option<&str>,
        system_prompt: &str,
        user_prompt: &str,
        config: &Config,
    ) -> Result<String, TranslationError> {
        match route {
            Route::Space { model_id, space, extra, .. } => {
                let state = self.spaces.connection(model_id, space, token).await;
                let client = state.client(space)?;
                let request = extra.iter().fold(
                    PredictRequest::new(user_prompt, system_prompt),
                    |request, (name, value)| request.extra(name.as_str(), value.clone()),
                );
                let response = with_deadline(
                    config.request_timeout(),
                    client.predict(CHAT_ENDPOINT, request),
                )
                .await?;
                Ok(project_reply(&response.to_value()))
            }
            Route::Inference { model_id, provider } => {
                let token = token.ok_or_else(|| TranslationError::MissingCredential {
                    model: model_id.clone(),
                    credential: "api_key",
                })?;
                let request = ChatCompletionRequest::new(model_id.as_str())
                    .provider(provider.as_str())
                    .add_message("system", system_prompt)
                    .add_message("user", user_prompt);
                let response = with_deadline(
                    config.request_timeout(),
                    self.inference.chat_completion(token, request),
                )
                .await?;
                Ok(response.text())
            }
        }
    }
}

/// Await a transport call, mapping an expired deadline to `Timeout`
async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, TranslationError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(TranslationError::from),
        Err(_) => Err(TranslationError::Timeout {
            stage: "waiting for a reply",
            after: deadline,
        }),
    }
}
