//! Shared mock providers for agent tests.

use ledgerwise_core::error::ProviderError;
use ledgerwise_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

fn text_response(text: String, model: String) -> ProviderResponse {
    ProviderResponse {
        text,
        model,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// Answers with the length of the prompt it received.
pub struct EchoLengthProvider;

#[async_trait::async_trait]
impl Provider for EchoLengthProvider {
    fn name(&self) -> &str {
        "echo_length"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(text_response(
            format!("prompt length {}", request.prompt.len()),
            request.model,
        ))
    }
}

/// Returns a fixed answer and records every request.
pub struct RecordingProvider {
    answer: String,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl RecordingProvider {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        Ok(text_response(self.answer.clone(), model))
    }
}

/// Always fails with the configured error.
pub struct FailingProvider {
    error: ProviderError,
}

impl FailingProvider {
    pub fn timeout() -> Self {
        Self {
            error: ProviderError::Timeout("generation exceeded 60s".into()),
        }
    }

    pub fn quota() -> Self {
        Self {
            error: ProviderError::RateLimited { retry_after_secs: 30 },
        }
    }
}

#[async_trait::async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.error.clone())
    }
}
