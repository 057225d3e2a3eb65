//! Timeout and retry wrapper.
//!
//! Every call to the wrapped provider is bounded by a timeout. Retryable
//! failures (timeouts, network errors, rate limits, 5xx) are retried with
//! exponential backoff up to `max_retries` extra attempts.

use async_trait::async_trait;
use ledgerwise_core::error::ProviderError;
use ledgerwise_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that bounds and retries calls to an inner provider.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
}

impl RetryingProvider {
    /// Wrap `inner` with a per-attempt timeout and no retries.
    pub fn new(inner: Arc<dyn Provider>, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            max_retries: 0,
            backoff_base: Duration::from_millis(500),
        }
    }

    /// Retry retryable failures up to `max_retries` times.
    pub fn with_retries(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self
    }

    /// Build from the `[generation]` config section.
    pub fn from_config(inner: Arc<dyn Provider>, config: &ledgerwise_config::GenerationConfig) -> Self {
        Self::new(inner, Duration::from_secs(config.timeout_secs)).with_retries(
            config.max_retries,
            Duration::from_millis(config.backoff_base_ms),
        )
    }

    fn backoff_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let exponential = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                exponential.max(Duration::from_secs(*retry_after_secs))
            }
            _ => exponential,
        }
    }

    async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let provider_name = self.inner.name().to_string();
        let mut attempt = 0u32;

        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(format!(
                    "Provider '{}' {} timed out after {}ms",
                    provider_name,
                    operation,
                    self.timeout.as_millis()
                ))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff_for(attempt, &e);
                    attempt += 1;
                    warn!(
                        provider = %provider_name,
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retryable provider failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if attempt > 0 {
                        info!(provider = %provider_name, operation, attempts = attempt + 1, "Giving up after retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.run("completion", || self.inner.complete(request.clone()))
            .await
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        self.run("embedding", || self.inner.embed(request.clone()))
            .await
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.run("health check", || self.inner.health_check()).await
    }
}
