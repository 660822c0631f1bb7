/*!
 * Batch translation processing.
 *
 * Splits a long list of texts into batches no larger than the engine's
 * `max_request_length` and fetches them one after another, pausing
 * `batch_delay` between calls. The run stops at the first failed batch.
 */

use log::{debug, error};
use std::sync::Arc;
use std::time::Instant;

use crate::errors::TranslationFailure;

use super::core::BatchTranslationClient;

/// Batch translator for lists longer than a single request
pub struct BatchTranslator {
    /// The engine to use
    client: Arc<BatchTranslationClient>,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(client: Arc<BatchTranslationClient>) -> Self {
        Self { client }
    }

    /// Split `texts` into request-sized batches
    pub fn batches(&self, texts: &[String]) -> Vec<Vec<String>> {
        let size = self.client.descriptor().max_request_length.max(1);
        texts.chunks(size).map(<[String]>::to_vec).collect()
    }

    /// Translate every text, keeping the input order.
    ///
    /// `progress_callback` receives `(completed_batches, total_batches)`.
    pub async fn translate_all(
        &self,
        texts: &[String],
        model: Option<&str>,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<Vec<String>, TranslationFailure> {
        let batches = self.batches(texts);
        let total_batches = batches.len();
        let delay = self.client.descriptor().batch_delay;
        let mut translations = Vec::with_capacity(texts.len());

        for (batch_index, batch) in batches.iter().enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(delay).await;
            }

            let start_time = Instant::now();
            match self.client.fetch(batch, model).await {
                Ok(translated) => {
                    debug!(
                        "Batch {} of {} completed in {:?}",
                        batch_index + 1,
                        total_batches,
                        start_time.elapsed()
                    );
                    translations.extend(translated);
                }
                Err(e) => {
                    error!("Batch {} of {} failed: {}", batch_index + 1, total_batches, e);
                    return Err(e);
                }
            }

            progress_callback(batch_index + 1, total_batches);
        }

        Ok(translations)
    }
}
