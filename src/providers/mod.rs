/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported LLM providers:
 * - Anthropic: Anthropic Messages API
 * - OpenAI: OpenAI-compatible Chat Completions API
 * - Mock: deterministic in-process provider for tests and benchmarks
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Sampling parameters shared by every request of a run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Temperature for generation
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.3,
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind the batch translation adapter.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Build a request carrying a system instruction and a single user message
    fn build_request(&self, system: &str, prompt: &str, settings: &GenerationSettings) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Read the body of a failed response and classify it
pub(crate) async fn error_from_response(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let error_text = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    log::error!("{} API error ({}): {}", provider, status, error_text);
    ProviderError::from_status(status.as_u16(), error_text)
}

pub mod anthropic;
pub mod mock;
pub mod openai;
