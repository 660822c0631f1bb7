/*!
 * Model registry and backend routing.
 *
 * A model id names either a Gradio Space or a model on the inference
 * router. The registry holds both tables; the router turns a model id into
 * an explicit `Route` and checks that the credential it needs is present
 * before anything touches the network.
 */

use log::debug;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::TranslationError;

/// Where a registered model is served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// A Gradio Space (`owner/name`); restricted Spaces need `spaces_key`
    Space { space: String, restricted: bool },
    /// The inference router, through the named provider
    Inference { provider: String },
}

/// Backend kind of a resolved route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Space,
    Inference,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space => write!(f, "space"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

/// Outcome of routing a model id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Space {
        model_id: String,
        space: String,
        requires_credential: bool,
        /// Extra endpoint inputs, appended after the standard ones
        extra: Vec<(String, Value)>,
    },
    Inference {
        model_id: String,
        provider: String,
    },
}

impl Route {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Space { .. } => BackendKind::Space,
            Self::Inference { .. } => BackendKind::Inference,
        }
    }

    /// Space address or inference model id
    pub fn target(&self) -> &str {
        match self {
            Self::Space { space, .. } => space,
            Self::Inference { model_id, .. } => model_id,
        }
    }

    pub fn model_id(&self) -> &str {
        match self {
            Self::Space { model_id, .. } | Self::Inference { model_id, .. } => model_id,
        }
    }

    /// Inference models always need the API key
    pub fn requires_credential(&self) -> bool {
        match self {
            Self::Space { requires_credential, .. } => *requires_credential,
            Self::Inference { .. } => true,
        }
    }
}

static BUILTIN: Lazy<ModelRegistry> = Lazy::new(|| {
    ModelRegistry::new()
        .with_space("llama-3.1-405b", "Nymbo/Llama-3.1-405B-Instruct", false)
        .with_space("llama-3.1-405b-fp8", "as-cle-bert/Llama-3.1-405B-FP8", false)
        .with_space("Qwen-2.5-72B-Instruct", "Nymbo/Qwen-2.5-72B-Instruct", false)
        .with_space("Command-R-Plus-08-2024", "Nymbo/Command-R-Plus-08-2024", false)
        .with_space("Command-R+", "Nymbo/c4ai-command-r-plus", false)
        .with_inference("deepseek-ai/DeepSeek-V3", "fireworks-ai")
        .with_inference("deepseek-ai/DeepSeek-V3-0324", "fireworks-ai")
        .with_inference("deepseek-ai/DeepSeek-R1", "fireworks-ai")
        .with_inference("deepseek-ai/DeepSeek-R1-0528", "fireworks-ai")
        .with_inference("Qwen/Qwen3-235B-A22B", "fireworks-ai")
        .with_inference("Qwen/Qwen2.5-72B-Instruct", "hf-inference")
        .with_inference("Qwen/QwQ-32B", "hf-inference")
        .with_inference("moonshotai/Kimi-K2-Instruct", "groq")
        .with_inference("shisa-ai/shisa-v2-llama3.3-70b", "featherless-ai")
        .with_inference("meta-llama/Llama-3.3-70B-Instruct", "fireworks-ai")
        .with_inference("google/gemma-3-27b-it", "hf-inference")
});

/// Immutable model tables: Spaces and inference models
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    spaces: BTreeMap<String, (String, bool)>,
    space_fields: BTreeMap<String, Vec<(String, Value)>>,
    inference: BTreeMap<String, String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The models shipped with the engine
    pub fn builtin() -> &'static ModelRegistry {
        &BUILTIN
    }

    /// Register a Space-hosted model
    pub fn with_space(mut self, model_id: &str, space: &str, restricted: bool) -> Self {
        self.spaces
            .insert(model_id.to_string(), (space.to_string(), restricted));
        self
    }

    /// Attach an extra endpoint input to a registered Space model, e.g. the
    /// key a credentialed proxy Space expects. Unknown ids are ignored.
    pub fn with_space_field(mut self, model_id: &str, name: &str, value: Value) -> Self {
        if self.spaces.contains_key(model_id) {
            self.space_fields
                .entry(model_id.to_string())
                .or_default()
                .push((name.to_string(), value));
        }
        self
    }

    /// Extra endpoint inputs of a Space model, in registration order
    pub fn space_fields(&self, model_id: &str) -> &[(String, Value)] {
        self.space_fields.get(model_id).map_or(&[], Vec::as_slice)
    }

    /// Register an inference model; ids already taken by a Space are ignored
    pub fn with_inference(mut self, model_id: &str, provider: &str) -> Self {
        if !self.spaces.contains_key(model_id) {
            self.inference
                .insert(model_id.to_string(), provider.to_string());
        }
        self
    }

    /// Look a model up, Spaces first
    pub fn get(&self, model_id: &str) -> Option<Backend> {
        if let Some((space, restricted)) = self.spaces.get(model_id) {
            return Some(Backend::Space {
                space: space.clone(),
                restricted: *restricted,
            });
        }
        self.inference.get(model_id).map(|provider| Backend::Inference {
            provider: provider.clone(),
        })
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.spaces.contains_key(model_id) || self.inference.contains_key(model_id)
    }

    /// Every registered model id, Spaces first
    pub fn model_ids(&self) -> Vec<&str> {
        self.spaces
            .keys()
            .chain(self.inference.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Resolves model ids to routes and enforces credential requirements
#[derive(Debug, Clone)]
pub struct ModelRouter {
    registry: Arc<ModelRegistry>,
}

impl ModelRouter {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Map a model id onto its backend
    pub fn resolve_backend(&self, model_id: &str) -> Result<Route, TranslationError> {
        let route = match self.registry.get(model_id) {
            Some(Backend::Space { space, restricted }) => Route::Space {
                model_id: model_id.to_string(),
                space,
                requires_credential: restricted,
                extra: self.registry.space_fields(model_id).to_vec(),
            },
            Some(Backend::Inference { provider }) => Route::Inference {
                model_id: model_id.to_string(),
                provider,
            },
            None => return Err(TranslationError::UnknownModel(model_id.to_string())),
        };
        debug!("Routing {} to {} backend {}", model_id, route.kind(), route.target());
        Ok(route)
    }

    /// Pick the credential for a route.
    ///
    /// Fails with `MissingCredential` when the route needs a key the config
    /// lacks. Open Spaces still receive the Spaces key when one is set.
    pub fn authorize(&self, route: &Route, config: &Config) -> Result<Option<String>, TranslationError> {
        let (credential, value) = match route {
            Route::Space { .. } => ("spaces_key", config.spaces_key()),
            Route::Inference { .. } => ("api_key", config.api_key()),
        };

        match value {
            Some(key) => Ok(Some(key.to_string())),
            None if route.requires_credential() => Err(TranslationError::MissingCredential {
                model: route.model_id().to_string(),
                credential,
            }),
            None => Ok(None),
        }
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new(Arc::new(ModelRegistry::builtin().clone()))
    }
}
