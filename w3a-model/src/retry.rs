//! Backoff for transient Gemini failures.

use std::{future::Future, time::Duration};
use w3a_core::{Result, W3aError};

/// Marker the Gemini client puts in errors worth another attempt.
pub const RETRYABLE_MARKER: &str = "[retryable]";
const FATAL_MARKER: &str = "[non-retryable]";

const TRANSIENT_WORDING: [&str; 3] = ["timed out", "connection reset", "connection refused"];

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Attempts after the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Wait before retry number `retry` (zero based), capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(32) as i32);
        let scaled = self.initial_delay.as_secs_f64() * factor;
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

/// Request timeout, rate limiting and server-side failures.
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
}

pub fn is_retryable_model_error(error: &W3aError) -> bool {
    let W3aError::Model(message) = error else {
        return false;
    };
    if message.contains(RETRYABLE_MARKER) {
        return true;
    }
    if message.contains(FATAL_MARKER) {
        return false;
    }
    let lower = message.to_ascii_lowercase();
    lower.contains("timeout") || TRANSIENT_WORDING.iter().any(|w| lower.contains(w))
}

/// Runs `operation` until it succeeds, fails with an error `should_retry` rejects,
/// or the retries run out.
pub async fn execute_with_retry<T, Op, Fut, Pred>(
    config: &RetryConfig,
    should_retry: Pred,
    mut operation: Op,
) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    Pred: Fn(&W3aError) -> bool,
{
    let budget = if config.enabled { config.max_retries } else { 0 };
    let mut retry = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if retry >= budget || !should_retry(&error) {
            return Err(error);
        }
        let delay = config.delay_for(retry);
        retry += 1;
        w3a_telemetry::warn!(
            retry,
            max_retries = budget,
            delay_ms = delay.as_millis() as u64,
            %error,
            "retrying model request"
        );
        tokio::time::sleep(delay).await;
    }
}
