//! Per-call timeouts and the overall pipeline deadline.

use crate::error::ProviderError;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::warn;

/// Point in time after which a pipeline stops starting new work.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self {
            expires_at: Instant::now() + duration,
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Run a provider call with a timeout; elapsing counts as a provider failure.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout),
    }
}

/// Run a provider call with a timeout, logging and swallowing any failure.
pub async fn call_provider<T, F>(provider: &str, operation: &str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match with_timeout(timeout, call).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(provider, operation, error = %e, "Provider call failed");
            None
        }
    }
}
