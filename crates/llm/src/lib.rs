//! Model routing and provider clients.
//!
//! This crate owns everything between a resolved tool request and a provider
//! API: the static model capability catalog, the uniform [`Provider`]
//! contract, one client per provider kind, and the [`ProviderRegistry`] that
//! maps model names to clients honoring restriction lists and precedence.

mod catalog;
mod error;
pub mod provider;
mod registry;
mod request;
pub mod token;

pub use catalog::{Catalog, ModelCapability, TemperatureConstraint};
pub use config::ProviderKind;
pub use error::{LlmError, LlmResult as Result};
pub use provider::Provider;
pub use registry::{ModelResolution, ProviderRegistry, ToolCategory};
pub use request::{GenerationRequest, ModelResponse, ThinkingMode, Usage};
