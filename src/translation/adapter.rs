/*!
 * Batch translation contract and the adapter that fulfils it with any provider.
 */

use async_trait::async_trait;
use log::debug;

use crate::errors::ProviderError;
use crate::providers::{GenerationSettings, Provider};

use super::prompts::numbered;

/// Translate a batch of texts into one language in a single provider call.
///
/// Slot `i` of the result holds the translation of `texts[i]`, or `None` when
/// the provider gave no answer for it. The returned list may be shorter or
/// longer than the input; callers reconcile the counts.
#[async_trait]
pub trait BatchTranslator: Send + Sync {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<Option<String>>, ProviderError>;
}

/// Wraps a provider client with the numbered-list batch framing
#[derive(Debug)]
pub struct ProviderAdapter<P: Provider> {
    provider: P,
    system_prompt: String,
    settings: GenerationSettings,
}

impl<P: Provider> ProviderAdapter<P> {
    /// Create an adapter. `system_prompt` may contain a `{target_language}` placeholder.
    pub fn new(provider: P, system_prompt: impl Into<String>, settings: GenerationSettings) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            settings,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// System instruction for one call
    pub fn system_prompt_for(&self, target_language: &str) -> String {
        self.system_prompt.replace("{target_language}", target_language)
    }

    /// Check that the provider is reachable and accepts the credentials
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }
}

#[async_trait]
impl<P: Provider> BatchTranslator for ProviderAdapter<P> {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<Option<String>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let system = self.system_prompt_for(target_language);
        let prompt = numbered::build_prompt(texts);
        let request = self.provider.build_request(&system, &prompt, &self.settings);

        let response = self.provider.complete(request).await?;
        let text = P::extract_text(&response);
        let mut answers = numbered::parse_response(&text);

        // Numbers past the batch are extras, kept after the matched slots
        let extra = answers.split_off(&(texts.len() + 1));
        let mut translations: Vec<Option<String>> = (1..=texts.len()).map(|n| answers.remove(&n)).collect();
        translations.extend(extra.into_values().map(Some));

        debug!(
            "Provider answered {} of {} item(s)",
            translations.iter().flatten().count(),
            texts.len()
        );
        Ok(translations)
    }
}
