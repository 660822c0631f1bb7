/*!
 * Prompt templates for batch translation.
 *
 * The model receives every text as a numbered JSON string literal and is told
 * to answer in exactly the same shape, one item per line. Escaping through
 * JSON keeps embedded line breaks and quotes from breaking the line format.
 */

use crate::app_config::default_target_language;

/// System prompt template for batch translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for batch translation.
    pub const BATCH_TRANSLATOR: &'static str = r#"You are a professional translator. Translate every numbered item the user sends into {target_language}.

## Output Requirements
- Answer with exactly as many items as you received, in the same order, each keeping its number
- Write one item per line in the form: N. "translation"
- Each translation is a JSON string literal: escape quotes as \", backslashes as \\ and line breaks as \n
- Never merge, split, skip or add items
- Do not add explanations, notes or any text outside the numbered list"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default batch translator template.
    pub fn batch_translator() -> Self {
        Self::new(Self::BATCH_TRANSLATOR)
    }

    /// Render the template with the given target language.
    pub fn render(&self, target_language: &str) -> String {
        self.template.replace("{target_language}", target_language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::batch_translator()
    }
}

/// Builds the system and user messages for one batch.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    target_language: String,
    template: PromptTemplate,
}

impl PromptBuilder {
    /// Create a new prompt builder; an empty language falls back to "English - US".
    pub fn new(target_language: &str) -> Self {
        let target_language = target_language.trim();
        Self {
            target_language: if target_language.is_empty() {
                default_target_language()
            } else {
                target_language.to_string()
            },
            template: PromptTemplate::default(),
        }
    }

    /// Use a custom system prompt template.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Build the system prompt.
    pub fn build_system_prompt(&self) -> String {
        self.template.render(&self.target_language)
    }

    /// Build the user prompt listing every text with its number.
    pub fn build_user_prompt(&self, texts: &[String]) -> String {
        let noun = if texts.len() == 1 { "item" } else { "items" };
        format!(
            "Translate the following {} {}:\n\n{}",
            texts.len(),
            noun,
            Self::format_items(texts)
        )
    }

    /// Build both system and user prompts.
    pub fn build(&self, texts: &[String]) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt(texts))
    }

    /// Render texts in the numbered wire format, one `N. "json"` line each.
    ///
    /// This is both how the request lists its texts and the exact shape the
    /// model is asked to answer with.
    pub fn format_items(texts: &[String]) -> String {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| format!("{}. {}", i + 1, quote(text)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn quote(text: &str) -> String {
    // Serializing a str cannot fail
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}
