/*!
 * Batch translation against hosted models.
 *
 * This module contains the engine and the pieces it is built from:
 *
 * - `core`: `BatchTranslationClient`, the `fetch` entry point
 * - `batch`: splitting long lists into request-sized batches
 * - `prompts`: system/user prompt construction and the numbered wire format
 * - `parser`: recovery of ordered items from model replies
 * - `router`: model registry and backend routing
 * - `connection`: the memoized Space connection
 */

// Re-export main types for easier usage
pub use self::batch::BatchTranslator;
pub use self::connection::{ConnectionState, ConnectionStatus, SpaceConnectionCache};
pub use self::core::{BatchTranslationClient, EngineDescriptor, TranslationRequest};
pub use self::parser::{parse_response, project_reply};
pub use self::prompts::{PromptBuilder, PromptTemplate};
pub use self::router::{Backend, BackendKind, ModelRegistry, ModelRouter, Route};

// Submodules
pub mod batch;
pub mod connection;
pub mod core;
pub mod parser;
pub mod prompts;
pub mod router;
