//! Shared HTTP plumbing: client construction, retry with backoff, and
//! provider error mapping.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::LlmError;
use crate::request::ThinkingMode;

/// Timeout for ordinary requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout when the request asks for a deep thinking budget.
const DEEP_THINKING_TIMEOUT: Duration = Duration::from_secs(600);

/// Hard timeout for one provider call.
pub(crate) fn request_timeout(thinking_mode: Option<ThinkingMode>) -> Duration {
    if thinking_mode.is_some_and(|mode| mode.is_deep()) {
        DEEP_THINKING_TIMEOUT
    } else {
        DEFAULT_TIMEOUT
    }
}

/// Build the shared HTTP client for a provider instance.
pub(crate) fn client() -> crate::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            log::error!("Failed to create HTTP client: {e}");
            LlmError::Internal(None)
        })
}

/// Exponential backoff schedule for transient provider failures.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub growth: u32,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(300),
            growth: 2,
            cap: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.growth.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.cap)
    }
}

/// Send a request, retrying transport failures and retryable statuses.
///
/// 408, 429 and 5xx are retryable; a 429 honors `Retry-After` when present.
/// Any other status is returned to the caller for terminal mapping, as is the
/// last response once the retry budget is spent.
pub(crate) async fn send_with_retry(
    provider: &str,
    policy: &RetryPolicy,
    build: impl Fn() -> reqwest::RequestBuilder,
) -> crate::Result<Response> {
    let mut attempt = 0;

    loop {
        match build().send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let retryable = matches!(status, 408 | 429) || (500..=599).contains(&status);

                if !retryable || attempt >= policy.max_retries {
                    return Ok(response);
                }

                let delay = if status == 429 {
                    retry_after(&response).unwrap_or_else(|| policy.backoff_delay(attempt))
                } else {
                    policy.backoff_delay(attempt)
                };

                log::warn!(
                    "{provider} returned {status}, retrying in {delay:?} (attempt {}/{})",
                    attempt + 1,
                    policy.max_retries
                );

                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt >= policy.max_retries {
                    return Err(LlmError::Transport(format!(
                        "Failed to send request to {provider}: {e}"
                    )));
                }

                let delay = policy.backoff_delay(attempt);
                log::warn!(
                    "{provider} request failed ({e}), retrying in {delay:?} (attempt {}/{})",
                    attempt + 1,
                    policy.max_retries
                );

                tokio::time::sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

/// Map a non-success response to a terminal error, consuming the body.
pub(crate) async fn error_from_response(provider: &str, model: &str, response: Response) -> LlmError {
    let status = response.status().as_u16();
    let retry_after = retry_after(&response);

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    log::error!("{provider} API error ({status}): {message}");

    match status {
        400 => LlmError::InvalidRequest(message),
        401 => LlmError::AuthenticationFailed(message),
        403 => LlmError::InsufficientQuota(message),
        404 => LlmError::ModelUnavailable {
            requested: model.to_string(),
            detail: message,
        },
        429 => LlmError::RateLimited { message, retry_after },
        500 => LlmError::Internal(Some(message)),
        _ => LlmError::ProviderApiError { status, message },
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
