/*!
 * Transports for the remote model backends.
 *
 * Two kinds of backend are reachable:
 * - `inference`: the hosted chat-completion router, addressed by model id and provider
 * - `spaces`: community Gradio Spaces, reached through a predict-style call
 *
 * Both are consumed through the traits below so the engine can be driven by
 * mocks in tests.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::errors::ProviderError;

use self::inference::{ChatCompletionRequest, ChatCompletionResponse};
use self::spaces::{PredictRequest, PredictResponse};

/// Chat-completion backend
#[async_trait]
pub trait InferenceProvider: Send + Sync + Debug {
    /// Send a chat-completion request authenticated with `token`
    ///
    /// # Arguments
    /// * `token` - Bearer token for the inference API
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<ChatCompletionResponse, ProviderError>` - The response from the backend or an error
    async fn chat_completion(
        &self,
        token: &str,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError>;
}

/// Opens connections to Gradio Spaces
#[async_trait]
pub trait SpaceConnector: Send + Sync + Debug {
    /// Connect to a Space given as `owner/name`
    async fn connect(
        &self,
        space: &str,
        token: Option<&str>,
    ) -> Result<Arc<dyn SpaceClient>, ProviderError>;
}

/// An open connection to one Space
#[async_trait]
pub trait SpaceClient: Send + Sync + Debug {
    /// Call a named endpoint (e.g. `/chat`) and wait for its result
    async fn predict(
        &self,
        endpoint: &str,
        request: PredictRequest,
    ) -> Result<PredictResponse, ProviderError>;
}

pub mod inference;
pub mod spaces;
