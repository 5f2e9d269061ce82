use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationSettings, Provider, error_from_response};
use crate::errors::ProviderError;

/// Client for OpenAI-compatible Chat Completions endpoints
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Model used for every request
    model: String,
}

/// Chat completion request
#[derive(Debug, Serialize, Default)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// Conversation messages
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

/// A single completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIRequest {
    /// Create a new chat completion request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Chat Completions URL derived from the configured endpoint
    pub fn api_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.openai.com/v1/chat/completions".to_string()
        } else {
            format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Provider for OpenAI {
    type Request = OpenAIRequest;
    type Response = OpenAIResponse;

    fn build_request(&self, system: &str, prompt: &str, settings: &GenerationSettings) -> OpenAIRequest {
        OpenAIRequest::new(&self.model)
            .add_message("system", system)
            .add_message("user", prompt)
            .temperature(settings.temperature)
            .max_tokens(settings.max_tokens)
    }

    async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let response = self.client.post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI", response).await);
        }

        let openai_response = response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse OpenAI API response: {}", e)))?;

        if openai_response.choices.is_empty() {
            return Err(ProviderError::ParseError("OpenAI API returned no choices".to_string()));
        }
        if let Some(usage) = &openai_response.usage {
            debug!("OpenAI usage: {} prompt / {} completion tokens", usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(openai_response)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = OpenAIRequest::new(&self.model)
            .add_message("user", "Hello")
            .max_tokens(10);

        self.complete(request).await?;
        Ok(())
    }

    fn extract_text(response: &OpenAIResponse) -> String {
        response.choices.first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}
