use async_trait::async_trait;
use reqwest::Client;

use config::{CustomSettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::provider::openai_compat::{self, Auth, ChatCall, RequestOptions};
use crate::provider::{Provider, http};
use crate::request::{GenerationRequest, ModelResponse};

/// Client for a user-declared OpenAI-compatible endpoint (Ollama, vLLM,
/// LM Studio, corporate gateways).
///
/// The endpoint serves whatever the user says it serves: capabilities come
/// from the optional JSON registry file, falling back to a generic profile
/// for the declared `CUSTOM_MODEL_NAME`.
pub struct CustomProvider {
    client: Client,
    settings: CustomSettings,
    registry: Catalog,
}

impl CustomProvider {
    pub fn new(settings: &CustomSettings) -> crate::Result<Self> {
        let registry = match &settings.models_file {
            Some(path) => match Catalog::from_registry_file(path) {
                Ok(catalog) => catalog,
                Err(e) => {
                    log::warn!(
                        "Failed to load custom model registry from '{}': {e}",
                        path.display()
                    );
                    Catalog::default()
                }
            },
            None => Catalog::default(),
        };

        Ok(Self {
            client: http::client()?,
            settings: settings.clone(),
            registry,
        })
    }

    fn is_declared_model(&self, name: &str) -> bool {
        self.settings
            .model_name
            .as_deref()
            .is_some_and(|declared| declared.eq_ignore_ascii_case(name))
    }
}

#[async_trait]
impl Provider for CustomProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    fn validate_model(&self, name: &str) -> bool {
        self.registry.capabilities(name).is_some() || self.is_declared_model(name)
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        if let Some(capability) = self.registry.capabilities(name) {
            return Some(capability.clone());
        }

        self.is_declared_model(name)
            .then(|| Catalog::generic_capability(name, ProviderKind::Custom))
    }

    fn known_models(&self) -> Vec<ModelCapability> {
        let mut models = self.registry.entries().to_vec();

        if let Some(declared) = self.settings.model_name.as_deref() {
            if self.registry.capabilities(declared).is_none() {
                models.push(Catalog::generic_capability(declared, ProviderKind::Custom));
            }
        }

        models
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        let capability = self
            .capabilities(&request.model)
            .unwrap_or_else(|| Catalog::generic_capability(&request.model, ProviderKind::Custom));

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        request.temperature = temperature;
        if let Some(warning) = warning {
            log::warn!("Custom model '{}': {warning}", request.model);
            warnings.push(warning);
        }

        if !capability.supports_thinking && request.thinking_mode.take().is_some() {
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

        let base_url = self.settings.base_url.trim_end_matches('/');
        let auth = match &self.settings.api_key {
            Some(key) => Auth::Bearer(key),
            None => Auth::None,
        };

        let call = ChatCall {
            provider_label: "Custom",
            url: format!("{base_url}/chat/completions"),
            auth,
            query: Vec::new(),
        };

        let response = openai_compat::execute(&self.client, call, &wire, &request).await?;

        openai_compat::into_model_response(
            response,
            &request,
            capability.friendly_name.clone(),
            ProviderKind::Custom,
            warnings,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn settings(model_name: Option<&str>) -> CustomSettings {
        CustomSettings {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            model_name: model_name.map(str::to_string),
            models_file: None,
        }
    }

    #[test]
    fn declared_model_validates_case_insensitively() {
        let provider = CustomProvider::new(&settings(Some("Llama-3.2"))).unwrap();

        assert!(provider.validate_model("llama-3.2"));
        assert!(!provider.validate_model("other"));
    }

    #[test]
    fn without_declaration_nothing_validates() {
        let provider = CustomProvider::new(&settings(None)).unwrap();
        assert!(!provider.validate_model("llama-3.2"));
    }

    #[test]
    fn registry_file_extends_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"models": [{{"name": "qwen-coder", "context_window": 32768, "max_output_tokens": 8192}}]}}"#
        )
        .unwrap();

        let mut settings = settings(Some("llama-3.2"));
        settings.models_file = Some(file.path().to_path_buf());
        let provider = CustomProvider::new(&settings).unwrap();

        assert!(provider.validate_model("qwen-coder"));
        assert!(provider.validate_model("llama-3.2"));

        let capability = provider.capabilities("qwen-coder").unwrap();
        assert_eq!(capability.context_window, 32_768);
    }

    #[test]
    fn unreadable_registry_degrades_to_declared_model() {
        let mut settings = settings(Some("llama-3.2"));
        settings.models_file = Some("/nonexistent/registry.json".into());
        let provider = CustomProvider::new(&settings).unwrap();

        assert!(provider.validate_model("llama-3.2"));
        assert!(!provider.validate_model("qwen-coder"));
    }
}
