use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;

use config::{ApiKeySettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::error::LlmError;
use crate::provider::openai_compat::{self, Auth, ChatCall, RequestOptions};
use crate::provider::{Provider, http};
use crate::request::{GenerationRequest, ModelResponse};

const DEFAULT_XAI_API_URL: &str = "https://api.x.ai/v1";

/// X.AI Grok client. The API surface is OpenAI-compatible.
pub struct XaiProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl XaiProvider {
    pub fn new(settings: &ApiKeySettings) -> crate::Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: settings.api_key.clone(),
            base_url: DEFAULT_XAI_API_URL.to_string(),
        })
    }
}

#[async_trait]
impl Provider for XaiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Xai
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(ProviderKind::Xai).capabilities(name).is_some()
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        Catalog::builtin(ProviderKind::Xai).capabilities(name).cloned()
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        let capability = self.capabilities(&request.model).ok_or_else(|| LlmError::ModelUnavailable {
            requested: request.model.clone(),
            detail: "Model is not in the X.AI catalog".to_string(),
        })?;

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        request.temperature = temperature;
        if let Some(warning) = warning {
            log::warn!("X.AI model '{}': {warning}", request.model);
            warnings.push(warning);
        }

        if request.thinking_mode.take().is_some() {
            log::warn!("Model '{}' does not support thinking mode, ignoring", request.model);
            warnings.push("thinking_mode dropped: model has no thinking budget".to_string());
        }

        let options = RequestOptions {
            supports_system_prompt: capability.supports_system_prompt,
            supports_images: capability.supports_images,
            supports_json_mode: capability.supports_json_mode,
            ..Default::default()
        };

        let (wire, wire_warnings) = openai_compat::build_request(&request, options)?;
        warnings.extend(wire_warnings);

        let call = ChatCall {
            provider_label: "X.AI",
            url: format!("{}/chat/completions", self.base_url),
            auth: Auth::Bearer(&self.api_key),
            query: Vec::new(),
        };

        let response = openai_compat::execute(&self.client, call, &wire, &request).await?;

        openai_compat::into_model_response(
            response,
            &request,
            capability.friendly_name.clone(),
            ProviderKind::Xai,
            warnings,
        )
    }
}
