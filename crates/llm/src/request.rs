//! The uniform generation contract every provider client implements.

use config::ProviderKind;
use serde::{Deserialize, Serialize};

/// Thinking depth for models with a controllable reasoning budget.
///
/// Each level maps to a fraction of the model's maximum thinking tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingMode {
    Minimal,
    Low,
    Medium,
    High,
    Max,
}

impl ThinkingMode {
    /// Fraction of the model's maximum thinking-token budget.
    pub fn budget_fraction(self) -> f64 {
        match self {
            ThinkingMode::Minimal => 0.005,
            ThinkingMode::Low => 0.08,
            ThinkingMode::Medium => 0.33,
            ThinkingMode::High => 0.67,
            ThinkingMode::Max => 1.0,
        }
    }

    /// Concrete token budget for a model with the given maximum.
    pub fn budget_tokens(self, max_thinking_tokens: usize) -> usize {
        (max_thinking_tokens as f64 * self.budget_fraction()) as usize
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ThinkingMode::Minimal => "minimal",
            ThinkingMode::Low => "low",
            ThinkingMode::Medium => "medium",
            ThinkingMode::High => "high",
            ThinkingMode::Max => "max",
        }
    }

    /// Parse a lowercase mode name.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "minimal" => Some(ThinkingMode::Minimal),
            "low" => Some(ThinkingMode::Low),
            "medium" => Some(ThinkingMode::Medium),
            "high" => Some(ThinkingMode::High),
            "max" => Some(ThinkingMode::Max),
            _ => None,
        }
    }

    /// Whether this mode warrants the long provider timeout.
    pub fn is_deep(self) -> bool {
        matches!(self, ThinkingMode::High | ThinkingMode::Max)
    }
}

/// A single request against a resolved model.
///
/// Knobs a provider does not support are dropped with a warning rather than
/// rejected; the caller already validated everything user-facing.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully assembled prompt (history, files, and user content included).
    pub prompt: String,
    /// Canonical model name, already resolved through the catalog.
    pub model: String,
    /// Optional system prompt.
    pub system_prompt: Option<String>,
    /// Sampling temperature, validated against the model's constraint.
    pub temperature: f32,
    /// Response token cap; defaults to the model's maximum.
    pub max_output_tokens: Option<u32>,
    /// Reasoning budget for thinking-capable models.
    pub thinking_mode: Option<ThinkingMode>,
    /// Absolute file paths or `data:` URLs.
    pub images: Vec<String>,
    /// JSON schema for structured output, where supported.
    pub json_schema: Option<serde_json::Value>,
}

impl GenerationRequest {
    /// A plain text request with everything else defaulted.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            temperature: 0.5,
            max_output_tokens: None,
            thinking_mode: None,
            images: Vec::new(),
            json_schema: None,
        }
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

/// A completed generation.
#[derive(Debug, Clone, Serialize)]
pub struct ModelResponse {
    /// The model's text output.
    pub content: String,
    /// Token usage, when the provider reports it.
    pub usage: Option<Usage>,
    /// Canonical name of the model that produced the response.
    pub model_name: String,
    /// Human-readable model name for response metadata.
    pub friendly_name: String,
    /// Which provider served the request.
    pub provider: ProviderKind,
    /// Provider-specific extras (finish reason, warnings, and the like).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
