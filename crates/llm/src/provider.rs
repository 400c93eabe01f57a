//! Provider clients implementing the uniform generation contract.
//!
//! One adapter per provider kind. Native APIs (Google) speak their own wire
//! format; everything else rides the shared OpenAI-compatible module with a
//! per-provider URL pattern and auth header.

mod custom;
mod dial;
mod google;
mod http;
mod images;
mod openai;
mod openai_compat;
mod openrouter;
mod xai;

pub use custom::CustomProvider;
pub use dial::DialProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use xai::XaiProvider;

use async_trait::async_trait;
use config::ProviderKind;

use crate::catalog::{Catalog, ModelCapability};
use crate::request::{GenerationRequest, ModelResponse};

/// The capability set every provider client offers.
///
/// `generate` may block for the full provider timeout; it never streams back
/// up. `count_tokens` may be an estimate.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which provider kind this client serves.
    fn kind(&self) -> ProviderKind;

    /// Whether this client can serve the named model (canonical or alias).
    fn validate_model(&self, name: &str) -> bool;

    /// Capability metadata for the named model.
    fn capabilities(&self, name: &str) -> Option<ModelCapability>;

    /// Models this client is known to serve, for listings and error
    /// messages. Aggregators may serve more than they list here.
    fn known_models(&self) -> Vec<ModelCapability> {
        Catalog::builtin(self.kind()).entries().to_vec()
    }

    /// Execute one generation request.
    async fn generate(&self, request: GenerationRequest) -> crate::Result<ModelResponse>;

    /// Token count for budgeting purposes.
    fn count_tokens(&self, _name: &str, text: &str) -> usize {
        crate::token::estimate_tokens(text)
    }
}
