use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use config::{ApiKeySettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::error::LlmError;
use crate::provider::openai_compat::{self, Auth, ChatCall, RequestOptions};
use crate::provider::{Provider, http};
use crate::request::{GenerationRequest, ModelResponse, ThinkingMode};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(settings: &ApiKeySettings) -> crate::Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: settings.api_key.clone(),
            base_url: DEFAULT_OPENAI_API_URL.to_string(),
        })
    }

    /// Reasoning models (`o3`, `o3-mini`, `o4-mini`, …) run with a fixed
    /// temperature and take a `reasoning_effort` knob instead.
    fn is_reasoning_model(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
    }

    /// Derive `reasoning_effort` from the requested thinking mode.
    fn reasoning_effort(thinking_mode: Option<ThinkingMode>) -> &'static str {
        match thinking_mode {
            Some(ThinkingMode::Minimal) | Some(ThinkingMode::Low) => "low",
            Some(ThinkingMode::High) | Some(ThinkingMode::Max) => "high",
            Some(ThinkingMode::Medium) | None => "medium",
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openai
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(ProviderKind::Openai).capabilities(name).is_some()
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        Catalog::builtin(ProviderKind::Openai).capabilities(name).cloned()
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        let capability = self.capabilities(&request.model).ok_or_else(|| LlmError::ModelUnavailable {
            requested: request.model.clone(),
            detail: "Model is not in the OpenAI catalog".to_string(),
        })?;

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        request.temperature = temperature;
        if let Some(warning) = warning {
            log::warn!("OpenAI model '{}': {warning}", request.model);
            warnings.push(warning);
        }

        let reasoning = Self::is_reasoning_model(&request.model);

        if !reasoning && request.thinking_mode.take().is_some() {
            log::warn!("Model '{}' does not support thinking mode, ignoring", request.model);
            warnings.push("thinking_mode dropped: model has no thinking budget".to_string());
        }

        let options = RequestOptions {
            supports_system_prompt: capability.supports_system_prompt,
            supports_images: capability.supports_images,
            supports_json_mode: capability.supports_json_mode,
            reasoning_effort: reasoning.then(|| Self::reasoning_effort(request.thinking_mode)),
            use_max_completion_tokens: reasoning,
        };

        let (wire, wire_warnings) = openai_compat::build_request(&request, options)?;
        warnings.extend(wire_warnings);

        let call = ChatCall {
            provider_label: "OpenAI",
            url: format!("{}/chat/completions", self.base_url),
            auth: Auth::Bearer(&self.api_key),
            query: Vec::new(),
        };

        let response = openai_compat::execute(&self.client, call, &wire, &request).await?;

        openai_compat::into_model_response(
            response,
            &request,
            capability.friendly_name.clone(),
            ProviderKind::Openai,
            warnings,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn o_series_detection() {
        assert!(OpenAiProvider::is_reasoning_model("o3"));
        assert!(OpenAiProvider::is_reasoning_model("o3-mini"));
        assert!(OpenAiProvider::is_reasoning_model("o4-mini"));
        assert!(!OpenAiProvider::is_reasoning_model("gpt-4.1"));
        assert!(!OpenAiProvider::is_reasoning_model("omni"));
    }

    #[test]
    fn reasoning_effort_tracks_thinking_mode() {
        assert_eq!(OpenAiProvider::reasoning_effort(None), "medium");
        assert_eq!(OpenAiProvider::reasoning_effort(Some(ThinkingMode::Minimal)), "low");
        assert_eq!(OpenAiProvider::reasoning_effort(Some(ThinkingMode::Medium)), "medium");
        assert_eq!(OpenAiProvider::reasoning_effort(Some(ThinkingMode::Max)), "high");
    }
}
