/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Answers every numbered item with a marked translation
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::drop_last()` - Answers one item short
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{GenerationSettings, Provider};
use crate::translation::prompts::numbered;

/// Mock request for testing
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// System instruction
    pub system: String,
    /// Numbered user prompt
    pub prompt: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The raw response text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with one translation per item
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns one translation fewer than requested
    DropLast,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for cancellation and timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Requests received so far
    requests: Arc<Mutex<Vec<MockRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockRequest) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that answers one item short
    pub fn drop_last() -> Self {
        Self::new(MockBehavior::DropLast)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that waits before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn recorded_requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Generate a numbered response marking each prompt item as translated
    pub fn generate_numbered_response(prompt: &str) -> String {
        Self::format_answers(&Self::translated_items(prompt))
    }

    fn translated_items(prompt: &str) -> BTreeMap<usize, String> {
        numbered::parse_response(prompt)
            .into_iter()
            .map(|(number, item)| (number, format!("[TRANSLATED] {}", item)))
            .collect()
    }

    fn format_answers(answers: &BTreeMap<usize, String>) -> String {
        answers
            .iter()
            .map(|(number, text)| numbered::format_item(*number, text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn respond(&self, request: &MockRequest) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => Self::generate_numbered_response(&request.prompt),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    fn build_request(&self, system: &str, prompt: &str, _settings: &GenerationSettings) -> MockRequest {
        MockRequest {
            system: system.to_string(),
            prompt: prompt.to_string(),
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(MockResponse { text: self.respond(&request) }),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(MockResponse { text: self.respond(&request) })
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::DropLast => {
                let mut answers = numbered::parse_response(&self.respond(&request));
                answers.pop_last();
                Ok(MockResponse { text: Self::format_answers(&answers) })
            }

            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(MockResponse { text: self.respond(&request) })
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}
