/*!
 * Core translation service implementation.
 *
 * `TranslationService` picks the provider client named by the configuration
 * and exposes it through the `BatchTranslator` contract.
 */

use async_trait::async_trait;
use log::info;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider as ConfigTranslationProvider};
use crate::errors::{ConfigError, ProviderError};
use crate::providers::GenerationSettings;
use crate::providers::anthropic::Anthropic;
use crate::providers::openai::OpenAI;

use super::adapter::{BatchTranslator, ProviderAdapter};

/// Translation provider implementation variants
enum TranslationProviderImpl {
    /// Anthropic API service
    Anthropic {
        /// Client wrapped with batch framing
        adapter: ProviderAdapter<Anthropic>,
    },

    /// OpenAI-compatible API service
    OpenAI {
        /// Client wrapped with batch framing
        adapter: ProviderAdapter<OpenAI>,
    },
}

/// Main translation service backed by a configured provider
pub struct TranslationService {
    /// Provider implementation
    provider: TranslationProviderImpl,

    /// Configuration for the translation service
    pub config: TranslationConfig,
}

impl TranslationService {
    /// Create a new translation service with the given configuration
    pub fn new(config: TranslationConfig) -> Result<Self, ConfigError> {
        let api_key = config.get_api_key();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey(config.provider.display_name().to_string()));
        }

        let endpoint = config.get_endpoint();
        let model = config.get_model();
        let timeout = Duration::from_secs(config.get_timeout_secs());
        let settings = GenerationSettings {
            max_tokens: config.common.max_tokens,
            temperature: config.common.temperature,
        };
        let system_prompt = config.common.system_prompt.clone();

        let provider = match config.provider {
            ConfigTranslationProvider::Anthropic => TranslationProviderImpl::Anthropic {
                adapter: ProviderAdapter::new(
                    Anthropic::new(api_key, endpoint, model, timeout),
                    system_prompt,
                    settings,
                ),
            },
            ConfigTranslationProvider::OpenAI => TranslationProviderImpl::OpenAI {
                adapter: ProviderAdapter::new(
                    OpenAI::new(api_key, endpoint, model, timeout),
                    system_prompt,
                    settings,
                ),
            },
        };

        Ok(Self { provider, config })
    }

    /// Test the connection to the translation provider
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        info!(
            "Testing connection to {} with model {}",
            self.config.provider.display_name(),
            self.config.get_model()
        );

        match &self.provider {
            TranslationProviderImpl::Anthropic { adapter } => adapter.test_connection().await,
            TranslationProviderImpl::OpenAI { adapter } => adapter.test_connection().await,
        }
    }
}

#[async_trait]
impl BatchTranslator for TranslationService {
    async fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<Option<String>>, ProviderError> {
        match &self.provider {
            TranslationProviderImpl::Anthropic { adapter } => adapter.translate_batch(texts, target_language).await,
            TranslationProviderImpl::OpenAI { adapter } => adapter.translate_batch(texts, target_language).await,
        }
    }
}
