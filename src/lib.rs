/*!
 * # hfspaces-translate - batch translation through Hugging Face models
 *
 * A translation engine that sends batches of texts to hosted language models
 * and maps the replies back onto the request, one translation per text.
 *
 * ## Features
 *
 * - Two backends:
 *   - Gradio Spaces reached through their chat endpoint
 *   - The Hugging Face inference router (chat completions through a named provider)
 * - A numbered, JSON-escaped wire format shared by prompts and replies
 * - Tolerant reply parsing: commentary, renumbering, code fences, quoting, JSON arrays
 * - All-or-nothing batches with typed failures (credential, transport, parse, unknown model, timeout)
 * - One memoized Space connection per engine, shared by concurrent callers
 *
 * ## Architecture
 *
 * - `app_config`: Engine options and transport settings
 * - `translation`: The engine:
 *   - `translation::core`: `BatchTranslationClient::fetch`
 *   - `translation::batch`: Splitting long lists into batches
 *   - `translation::prompts`: Prompt construction
 *   - `translation::parser`: Reply recovery
 *   - `translation::router`: Model registry and routing
 *   - `translation::connection`: Space connection cache
 * - `providers`: Transports for the remote backends:
 *   - `providers::inference`: Inference router client
 *   - `providers::spaces`: Gradio Space client
 * - `errors`: Error types and the host-facing failure record
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{FailureKind, ProviderError, TranslationError, TranslationFailure};
pub use translation::{BatchTranslationClient, BatchTranslator, ModelRegistry, PromptBuilder};
pub use translation::parser::parse_response;
