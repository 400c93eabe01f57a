use async_trait::async_trait;
use reqwest::Client;

use config::{DialSettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::error::LlmError;
use crate::provider::openai_compat::{self, Auth, ChatCall, RequestOptions};
use crate::provider::{Provider, http};
use crate::request::{GenerationRequest, ModelResponse};

/// DIAL gateway client.
///
/// DIAL scopes the OpenAI-compatible endpoint per deployment:
/// `{host}/openai/deployments/{model}/chat/completions`, authenticated with
/// an `Api-Key` header and an optional `api-version` query parameter.
pub struct DialProvider {
    client: Client,
    settings: DialSettings,
}

impl DialProvider {
    pub fn new(settings: &DialSettings) -> crate::Result<Self> {
        Ok(Self {
            client: http::client()?,
            settings: settings.clone(),
        })
    }

    fn deployment_url(&self, model: &str) -> String {
        let host = self.settings.host.trim_end_matches('/');
        format!("{host}/openai/deployments/{model}/chat/completions")
    }
}

#[async_trait]
impl Provider for DialProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dial
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(ProviderKind::Dial).capabilities(name).is_some()
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        Catalog::builtin(ProviderKind::Dial).capabilities(name).cloned()
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        let capability = self.capabilities(&request.model).ok_or_else(|| LlmError::ModelUnavailable {
            requested: request.model.clone(),
            detail: "Model is not a known DIAL deployment".to_string(),
        })?;

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        request.temperature = temperature;
        if let Some(warning) = warning {
            log::warn!("DIAL deployment '{}': {warning}", request.model);
            warnings.push(warning);
        }

        if !capability.supports_thinking && request.thinking_mode.take().is_some() {
            log::warn!("Deployment '{}' does not support thinking mode, ignoring", request.model);
            warnings.push("thinking_mode dropped: deployment has no thinking budget".to_string());
        }

        let options = RequestOptions {
            supports_system_prompt: capability.supports_system_prompt,
            supports_images: capability.supports_images,
            supports_json_mode: capability.supports_json_mode,
            ..Default::default()
        };

        let (wire, wire_warnings) = openai_compat::build_request(&request, options)?;
        warnings.extend(wire_warnings);

        let mut query = Vec::new();
        if let Some(version) = &self.settings.api_version {
            query.push(("api-version", version.clone()));
        }

        let call = ChatCall {
            provider_label: "DIAL",
            url: self.deployment_url(&request.model),
            auth: Auth::ApiKey(&self.settings.api_key),
            query,
        };

        let response = openai_compat::execute(&self.client, call, &wire, &request).await?;

        openai_compat::into_model_response(
            response,
            &request,
            capability.friendly_name.clone(),
            ProviderKind::Dial,
            warnings,
        )
    }
}
