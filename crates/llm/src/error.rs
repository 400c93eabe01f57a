use std::time::Duration;

use thiserror::Error;

pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors produced while resolving models or talking to provider APIs.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The requested model could not be served, either because resolution
    /// failed or because the provider rejected it.
    #[error("Model '{requested}' is not available. {detail}")]
    ModelUnavailable {
        /// The model name the caller asked for.
        requested: String,
        /// Resolution failures list the available models here; provider 404s
        /// carry the provider's message.
        detail: String,
    },

    /// A restriction list blocked the requested model.
    #[error("Model '{requested}' is not in {list_var} (allowed: {allowed})")]
    RestrictedModel {
        requested: String,
        list_var: &'static str,
        allowed: String,
    },

    /// Invalid request parameters, reported by us or by the provider.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed (missing or invalid API key).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Insufficient quota or permission.
    #[error("Insufficient quota: {0}")]
    InsufficientQuota(String),

    /// Rate limit exceeded after the retry budget was spent.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        /// Provider-supplied `Retry-After`, when present.
        retry_after: Option<Duration>,
    },

    /// Provider API returned an unexpected status.
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection failure after retries.
    #[error("Connection error: {0}")]
    Transport(String),

    /// Internal failure. `Some` carries a provider message safe to surface;
    /// `None` means our own internals and stays generic.
    #[error("Internal provider error")]
    Internal(Option<String>),
}

impl LlmError {
    /// Message that is safe to hand back to the MCP host.
    pub fn client_message(&self) -> String {
        match self {
            LlmError::Internal(Some(provider_msg)) => provider_msg.clone(),
            LlmError::Internal(None) => "Internal provider error".to_string(),
            other => other.to_string(),
        }
    }
}
