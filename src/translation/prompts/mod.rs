/*!
 * Prompt construction for batch translation.
 *
 * This module provides:
 * - The system prompt template that fixes the answer format
 * - The numbered wire format shared by requests and expected replies
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptBuilder, PromptTemplate};
