use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use config::{ApiKeySettings, ProviderKind};

use crate::catalog::{Catalog, ModelCapability};
use crate::provider::openai_compat::{self, Auth, ChatCall, RequestOptions};
use crate::provider::{Provider, http};
use crate::request::{GenerationRequest, ModelResponse};

const DEFAULT_OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter aggregator client.
///
/// Model names carry a vendor prefix (`vendor/model`) and pass through
/// unchanged; a small alias table covers the shorthands agents reach for.
/// The live `/models` listing is fetched once per process and consulted for
/// validation beyond the alias table.
pub struct OpenRouterProvider {
    client: Client,
    api_key: SecretString,
    base_url: String,
    listed_models: RwLock<Option<HashSet<String>>>,
}

impl OpenRouterProvider {
    pub fn new(settings: &ApiKeySettings) -> crate::Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_key: settings.api_key.clone(),
            base_url: DEFAULT_OPENROUTER_API_URL.to_string(),
            listed_models: RwLock::new(None),
        })
    }

    /// Fetch and cache the live model listing. Best effort: failures leave
    /// validation to the alias table and prefix heuristic.
    async fn ensure_listing(&self) {
        {
            let cached = self.listed_models.read().unwrap_or_else(|e| e.into_inner());
            if cached.is_some() {
                return;
            }
        }

        #[derive(serde::Deserialize)]
        struct ModelsResponse {
            data: Vec<ListedModel>,
        }

        #[derive(serde::Deserialize)]
        struct ListedModel {
            id: String,
        }

        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await;

        let listing = match result {
            Ok(response) if response.status().is_success() => match response.json::<ModelsResponse>().await {
                Ok(parsed) => parsed.data.into_iter().map(|m| m.id).collect(),
                Err(e) => {
                    log::warn!("Failed to parse OpenRouter model listing: {e}");
                    HashSet::new()
                }
            },
            Ok(response) => {
                log::warn!("OpenRouter model listing returned {}", response.status());
                HashSet::new()
            }
            Err(e) => {
                log::warn!("Failed to fetch OpenRouter model listing: {e}");
                HashSet::new()
            }
        };

        let mut cached = self.listed_models.write().unwrap_or_else(|e| e.into_inner());
        cached.get_or_insert(listing);
    }

    fn is_listed(&self, name: &str) -> bool {
        let cached = self.listed_models.read().unwrap_or_else(|e| e.into_inner());
        cached.as_ref().is_some_and(|models| models.contains(name))
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Openrouter
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(ProviderKind::Openrouter).capabilities(name).is_some()
            || name.contains('/')
            || self.is_listed(name)
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        let catalog = Catalog::builtin(ProviderKind::Openrouter);

        if let Some(capability) = catalog.capabilities(name) {
            return Some(capability.clone());
        }

        self.validate_model(name)
            .then(|| Catalog::generic_capability(name, ProviderKind::Openrouter))
    }

    async fn generate(&self, mut request: GenerationRequest) -> crate::Result<ModelResponse> {
        self.ensure_listing().await;

        let capability = self
            .capabilities(&request.model)
            .unwrap_or_else(|| Catalog::generic_capability(&request.model, ProviderKind::Openrouter));

        request.model = capability.name.clone();

        let mut warnings = Vec::new();

        let (temperature, warning) = capability.temperature.correct(request.temperature);
        request.temperature = temperature;
        if let Some(warning) = warning {
            log::warn!("OpenRouter model '{}': {warning}", request.model);
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

        let call = ChatCall {
            provider_label: "OpenRouter",
            url: format!("{}/chat/completions", self.base_url),
            auth: Auth::Bearer(&self.api_key),
            query: Vec::new(),
        };

        let response = openai_compat::execute(&self.client, call, &wire, &request).await?;

        openai_compat::into_model_response(
            response,
            &request,
            capability.friendly_name.clone(),
            ProviderKind::Openrouter,
            warnings,
        )
    }
}
