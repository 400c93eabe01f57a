//! Provider registry and model routing.
//!
//! One registry per process, built from the configuration snapshot at
//! bootstrap and shared behind an `Arc`. Model resolution probes enabled
//! providers in [`ProviderKind::PRECEDENCE`] order; restriction lists veto a
//! match before any request is sent.

use std::sync::Arc;

use indexmap::IndexMap;

use config::{ProviderKind, ProviderSettings};

use crate::catalog::{Catalog, ModelCapability};
use crate::error::LlmError;
use crate::provider::{
    CustomProvider, DialProvider, GoogleProvider, OpenAiProvider, OpenRouterProvider, Provider, XaiProvider,
};

/// The model class a tool prefers when the caller lets it pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    /// Latency and cost over depth (chat, quick summaries).
    FastResponse,
    /// Middle ground.
    Balanced,
    /// Deep multi-step reasoning (debug, review, audits).
    ExtendedReasoning,
}

/// A model resolved to the provider that will serve it.
#[derive(Clone)]
pub struct ModelResolution {
    /// The serving client.
    pub provider: Arc<dyn Provider>,
    /// Capability metadata with the canonical model name.
    pub capability: ModelCapability,
}

impl std::fmt::Debug for ModelResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelResolution")
            .field("provider", &self.provider.kind())
            .field("capability", &self.capability)
            .finish()
    }
}

/// Maps provider kinds to live clients and routes model names.
pub struct ProviderRegistry {
    providers: IndexMap<ProviderKind, Arc<dyn Provider>>,
    settings: ProviderSettings,
}

impl ProviderRegistry {
    /// Build clients for every enabled provider kind.
    ///
    /// A client that fails to construct is logged and skipped; the registry
    /// stays usable with whatever remains.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let mut registry = Self::empty(settings.clone());

        if let Some(google) = &settings.google {
            match GoogleProvider::new(google) {
                Ok(provider) => registry.register(ProviderKind::Google, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize Google provider: {e}"),
            }
        }

        if let Some(openai) = &settings.openai {
            match OpenAiProvider::new(openai) {
                Ok(provider) => registry.register(ProviderKind::Openai, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize OpenAI provider: {e}"),
            }
        }

        if let Some(xai) = &settings.xai {
            match XaiProvider::new(xai) {
                Ok(provider) => registry.register(ProviderKind::Xai, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize X.AI provider: {e}"),
            }
        }

        if let Some(dial) = &settings.dial {
            match DialProvider::new(dial) {
                Ok(provider) => registry.register(ProviderKind::Dial, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize DIAL provider: {e}"),
            }
        }

        if let Some(custom) = &settings.custom {
            match CustomProvider::new(custom) {
                Ok(provider) => registry.register(ProviderKind::Custom, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize custom provider: {e}"),
            }
        }

        if let Some(openrouter) = &settings.openrouter {
            match OpenRouterProvider::new(openrouter) {
                Ok(provider) => registry.register(ProviderKind::Openrouter, Arc::new(provider)),
                Err(e) => log::error!("Failed to initialize OpenRouter provider: {e}"),
            }
        }

        registry
    }

    /// An empty registry carrying only restriction lists. Tests register
    /// scripted providers into this.
    pub fn empty(settings: ProviderSettings) -> Self {
        Self {
            providers: IndexMap::new(),
            settings,
        }
    }

    /// Register a client for a kind. Idempotent: a second registration for
    /// the same kind is ignored.
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        if self.providers.contains_key(&kind) {
            log::debug!("Provider '{kind}' already registered, keeping the existing client");
            return;
        }

        self.providers.insert(kind, provider);
    }

    /// The client registered for a kind, if any.
    pub fn get_provider(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    /// Whether no provider is registered at all.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Resolve a model name (canonical or alias) to a serving provider.
    ///
    /// Kinds are probed in precedence order; the first client that validates
    /// the name wins. A restriction list on the winning kind vetoes the
    /// match with an error naming the list.
    pub fn resolve(&self, name: &str) -> crate::Result<ModelResolution> {
        for kind in ProviderKind::PRECEDENCE {
            let Some(provider) = self.providers.get(&kind) else {
                continue;
            };

            if !provider.validate_model(name) {
                continue;
            }

            let capability = provider
                .capabilities(name)
                .unwrap_or_else(|| Catalog::generic_capability(name, kind));

            let restriction = self.settings.restriction(kind);

            // The allow-list may name the canonical model or any alias.
            let allowed = restriction.allows(name)
                || restriction.allows(&capability.name)
                || capability.aliases.iter().any(|alias| restriction.allows(alias));

            if !allowed {
                return Err(LlmError::RestrictedModel {
                    requested: name.to_string(),
                    list_var: kind.allowed_models_var(),
                    allowed: restriction.entries().join(", "),
                });
            }

            log::debug!("Resolved model '{name}' to provider '{kind}' as '{}'", capability.name);

            return Ok(ModelResolution {
                provider: provider.clone(),
                capability,
            });
        }

        Err(LlmError::ModelUnavailable {
            requested: name.to_string(),
            detail: format!("Available models: {}", self.available_model_summary()),
        })
    }

    /// Canonical model names currently servable, mapped to their provider
    /// kind. Restriction lists are applied.
    pub fn available_models(&self) -> IndexMap<String, ProviderKind> {
        let mut models = IndexMap::new();

        for (kind, provider) in &self.providers {
            let restriction = self.settings.restriction(*kind);

            for capability in provider.known_models() {
                if !provider.validate_model(&capability.name) {
                    continue;
                }

                let allowed = restriction.allows(&capability.name)
                    || capability.aliases.iter().any(|alias| restriction.allows(alias));

                if allowed {
                    models.entry(capability.name.clone()).or_insert(*kind);
                }
            }
        }

        models
    }

    /// Human-readable list for error messages, aliases included.
    pub fn available_model_summary(&self) -> String {
        let mut entries = Vec::new();

        for (kind, provider) in &self.providers {
            let restriction = self.settings.restriction(*kind);

            for capability in provider.known_models() {
                let allowed = restriction.allows(&capability.name)
                    || capability.aliases.iter().any(|alias| restriction.allows(alias));

                if !provider.validate_model(&capability.name) || !allowed {
                    continue;
                }

                let mut entry = capability.name.clone();
                if !capability.aliases.is_empty() {
                    entry = format!("{entry} ({})", capability.aliases.join(", "));
                }
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            "none (no providers configured)".to_string()
        } else {
            entries.join(", ")
        }
    }

    /// The best available model for a tool category.
    ///
    /// Walks a static preference order and falls back to any available model
    /// when nothing preferred is servable.
    pub fn preferred_fallback(&self, category: ToolCategory) -> Option<String> {
        let preferences: &[&str] = match category {
            ToolCategory::FastResponse => &[
                "gemini-2.5-flash",
                "o4-mini",
                "grok-3-fast",
                "gemini-2.5-flash-preview-05-20",
            ],
            ToolCategory::Balanced => &["gemini-2.5-flash", "gpt-4.1", "grok-3", "anthropic/claude-sonnet-4"],
            ToolCategory::ExtendedReasoning => &[
                "gemini-2.5-pro",
                "o3",
                "grok-3",
                "gemini-2.5-pro-preview-05-06",
                "anthropic/claude-opus-4",
            ],
        };

        for name in preferences {
            if let Ok(resolution) = self.resolve(name) {
                return Some(resolution.capability.name);
            }
        }

        self.available_models().keys().next().cloned()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::request::{GenerationRequest, ModelResponse};

    struct ScriptedProvider {
        kind: ProviderKind,
        models: Vec<&'static str>,
    }

    impl ScriptedProvider {
        fn new(kind: ProviderKind, models: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                kind,
                models: models.to_vec(),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn validate_model(&self, name: &str) -> bool {
            self.models.contains(&name) || Catalog::builtin(self.kind).capabilities(name).is_some()
        }

        fn capabilities(&self, name: &str) -> Option<ModelCapability> {
            Catalog::builtin(self.kind)
                .capabilities(name)
                .cloned()
                .or_else(|| self.validate_model(name).then(|| Catalog::generic_capability(name, self.kind)))
        }

        async fn generate(&self, _request: GenerationRequest) -> crate::Result<ModelResponse> {
            Err(LlmError::Internal(None))
        }
    }

    fn settings_with(pairs: &[(&str, &str)]) -> ProviderSettings {
        ProviderSettings::from_lookup(&|key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
    }

    #[test]
    fn resolution_follows_precedence_order() {
        let mut registry = ProviderRegistry::empty(settings_with(&[]));
        registry.register(
            ProviderKind::Openrouter,
            ScriptedProvider::new(ProviderKind::Openrouter, &["google/gemini-2.5-flash"]),
        );
        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));

        let resolution = registry.resolve("flash").expect("flash should resolve");

        assert_eq!(resolution.provider.kind(), ProviderKind::Google);
        assert_eq!(resolution.capability.name, "gemini-2.5-flash");
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = ProviderRegistry::empty(settings_with(&[]));

        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));
        registry.register(
            ProviderKind::Google,
            ScriptedProvider::new(ProviderKind::Google, &["replacement"]),
        );

        // The first client wins; the replacement's extra model is unknown.
        assert!(registry.resolve("replacement").is_err());
    }

    #[test]
    fn unresolvable_model_lists_alternatives() {
        let mut registry = ProviderRegistry::empty(settings_with(&[]));
        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));

        let error = registry.resolve("unknown-model").expect_err("should fail");
        let message = error.to_string();

        assert!(message.contains("'unknown-model' is not available"));
        assert!(message.contains("gemini-2.5-flash"));
    }

    #[test]
    fn restriction_list_vetoes_resolution() {
        let settings = settings_with(&[("OPENAI_ALLOWED_MODELS", "o4-mini")]);
        let mut registry = ProviderRegistry::empty(settings);
        registry.register(ProviderKind::Openai, ScriptedProvider::new(ProviderKind::Openai, &[]));

        let error = registry.resolve("o3").expect_err("o3 should be vetoed");
        let message = error.to_string();

        assert!(message.contains("OPENAI_ALLOWED_MODELS"));
        assert!(message.contains("o4-mini"));

        assert!(registry.resolve("o4-mini").is_ok());
    }

    #[test]
    fn restriction_list_accepts_aliases() {
        let settings = settings_with(&[("GOOGLE_ALLOWED_MODELS", "flash")]);
        let mut registry = ProviderRegistry::empty(settings);
        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));

        // Both the alias and the canonical name resolve to the allowed model.
        assert!(registry.resolve("flash").is_ok());
        assert!(registry.resolve("gemini-2.5-flash").is_ok());
        assert!(registry.resolve("pro").is_err());
    }

    #[test]
    fn available_models_honors_restrictions() {
        let settings = settings_with(&[("GOOGLE_ALLOWED_MODELS", "flash")]);
        let mut registry = ProviderRegistry::empty(settings);
        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));

        let models = registry.available_models();

        assert!(models.contains_key("gemini-2.5-flash"));
        assert!(!models.contains_key("gemini-2.5-pro"));
    }

    #[test]
    fn fallback_prefers_category_models() {
        let mut registry = ProviderRegistry::empty(settings_with(&[]));
        registry.register(ProviderKind::Google, ScriptedProvider::new(ProviderKind::Google, &[]));

        assert_eq!(
            registry.preferred_fallback(ToolCategory::FastResponse).as_deref(),
            Some("gemini-2.5-flash")
        );
        assert_eq!(
            registry.preferred_fallback(ToolCategory::ExtendedReasoning).as_deref(),
            Some("gemini-2.5-pro")
        );
    }

    #[test]
    fn fallback_degrades_to_any_available_model() {
        let mut registry = ProviderRegistry::empty(settings_with(&[]));
        registry.register(ProviderKind::Xai, ScriptedProvider::new(ProviderKind::Xai, &[]));

        // No X.AI model is in the fast-response preference list's front, but
        // grok-3-fast is; reasoning falls through to grok-3.
        assert_eq!(
            registry.preferred_fallback(ToolCategory::FastResponse).as_deref(),
            Some("grok-3-fast")
        );
    }

    #[test]
    fn empty_registry_has_no_fallback() {
        let registry = ProviderRegistry::empty(settings_with(&[]));

        assert!(registry.is_empty());
        assert_eq!(registry.preferred_fallback(ToolCategory::Balanced), None);
    }
}
