//! Per-provider credentials and model restriction lists.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The family a provider client belongs to.
///
/// Native API surfaces come before aggregators in [`ProviderKind::PRECEDENCE`]
/// so that a model name served by both resolves to the native provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Gemini, native API.
    Google,
    /// OpenAI chat completions.
    Openai,
    /// X.AI Grok, OpenAI-compatible surface.
    Xai,
    /// OpenRouter aggregator, OpenAI-compatible surface.
    Openrouter,
    /// DIAL gateway with deployment-scoped URLs.
    Dial,
    /// User-declared OpenAI-compatible endpoint.
    Custom,
}

impl ProviderKind {
    /// Resolution order for model lookup: native kinds ahead of aggregators.
    pub const PRECEDENCE: [ProviderKind; 6] = [
        ProviderKind::Google,
        ProviderKind::Openai,
        ProviderKind::Xai,
        ProviderKind::Dial,
        ProviderKind::Custom,
        ProviderKind::Openrouter,
    ];

    /// Stable lowercase identifier, used in logs and response metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Openai => "openai",
            ProviderKind::Xai => "xai",
            ProviderKind::Openrouter => "openrouter",
            ProviderKind::Dial => "dial",
            ProviderKind::Custom => "custom",
        }
    }

    /// Name of the environment variable carrying this provider's allow-list.
    pub fn allowed_models_var(self) -> &'static str {
        match self {
            ProviderKind::Google => "GOOGLE_ALLOWED_MODELS",
            ProviderKind::Openai => "OPENAI_ALLOWED_MODELS",
            ProviderKind::Xai => "XAI_ALLOWED_MODELS",
            ProviderKind::Openrouter => "OPENROUTER_ALLOWED_MODELS",
            ProviderKind::Dial => "DIAL_ALLOWED_MODELS",
            ProviderKind::Custom => "CUSTOM_ALLOWED_MODELS",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for providers that need nothing beyond an API key.
#[derive(Debug, Clone)]
pub struct ApiKeySettings {
    /// Bearer key for the provider API.
    pub api_key: SecretString,
}

/// Settings for the DIAL gateway.
#[derive(Debug, Clone)]
pub struct DialSettings {
    /// DIAL API key, sent as an `Api-Key` header.
    pub api_key: SecretString,
    /// Gateway host, e.g. `https://dial.example.com`.
    pub host: String,
    /// Optional `api-version` query parameter.
    pub api_version: Option<String>,
}

/// Settings for a user-declared OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct CustomSettings {
    /// Base URL of the endpoint, e.g. `http://localhost:11434/v1`.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<SecretString>,
    /// Primary model served by the endpoint.
    pub model_name: Option<String>,
    /// Optional JSON file declaring model capabilities for this endpoint.
    pub models_file: Option<PathBuf>,
}

/// Credentials and restriction lists for every provider kind.
///
/// A kind is *enabled* when its required variables were present at startup;
/// disabled kinds are skipped entirely during model resolution.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Google Gemini credentials.
    pub google: Option<ApiKeySettings>,
    /// OpenAI credentials.
    pub openai: Option<ApiKeySettings>,
    /// X.AI credentials.
    pub xai: Option<ApiKeySettings>,
    /// OpenRouter credentials.
    pub openrouter: Option<ApiKeySettings>,
    /// DIAL gateway settings.
    pub dial: Option<DialSettings>,
    /// Custom endpoint settings.
    pub custom: Option<CustomSettings>,
    restrictions: [RestrictionList; 6],
}

impl ProviderSettings {
    /// Build provider settings from a variable lookup.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| non_empty(lookup(key)).map(SecretString::from);

        let google = secret("GEMINI_API_KEY")
            .or_else(|| secret("GOOGLE_API_KEY"))
            .map(|api_key| ApiKeySettings { api_key });

        let openai = secret("OPENAI_API_KEY").map(|api_key| ApiKeySettings { api_key });
        let xai = secret("XAI_API_KEY").map(|api_key| ApiKeySettings { api_key });
        let openrouter = secret("OPENROUTER_API_KEY").map(|api_key| ApiKeySettings { api_key });

        let dial = match (secret("DIAL_API_KEY"), non_empty(lookup("DIAL_API_HOST"))) {
            (Some(api_key), Some(host)) => Some(DialSettings {
                api_key,
                host,
                api_version: non_empty(lookup("DIAL_API_VERSION")),
            }),
            (Some(_), None) => {
                log::warn!("DIAL_API_KEY is set but DIAL_API_HOST is missing, DIAL provider disabled");
                None
            }
            _ => None,
        };

        let custom = non_empty(lookup("CUSTOM_API_URL")).map(|base_url| CustomSettings {
            base_url,
            api_key: secret("CUSTOM_API_KEY"),
            model_name: non_empty(lookup("CUSTOM_MODEL_NAME")),
            models_file: non_empty(lookup("CUSTOM_MODELS_FILE")).map(PathBuf::from),
        });

        let restrictions = ProviderKind::PRECEDENCE
            .map(|kind| RestrictionList::parse(lookup(kind.allowed_models_var()).as_deref()));

        Self {
            google,
            openai,
            xai,
            openrouter,
            dial,
            custom,
            restrictions,
        }
    }

    /// The allow-list declared for a provider kind. Empty list means
    /// unrestricted.
    pub fn restriction(&self, kind: ProviderKind) -> &RestrictionList {
        let index = ProviderKind::PRECEDENCE
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();

        &self.restrictions[index]
    }

    /// Whether any provider has usable credentials.
    pub fn any_enabled(&self) -> bool {
        !self.enabled_kinds().is_empty()
    }

    /// Enabled provider kinds, in resolution precedence order.
    pub fn enabled_kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::PRECEDENCE
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Whether a single provider kind has usable credentials.
    pub fn is_enabled(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::Google => self.google.is_some(),
            ProviderKind::Openai => self.openai.is_some(),
            ProviderKind::Xai => self.xai.is_some(),
            ProviderKind::Openrouter => self.openrouter.is_some(),
            ProviderKind::Dial => self.dial.is_some(),
            ProviderKind::Custom => self.custom.is_some(),
        }
    }
}

/// Env-driven allow-list of model names a provider may serve.
///
/// Matching is case-insensitive over canonical names and aliases; the list is
/// snapshotted at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestrictionList {
    models: Vec<String>,
}

impl RestrictionList {
    /// Parse a comma-separated list. `None`, blank input, and stray commas all
    /// yield an unrestricted list.
    pub fn parse(raw: Option<&str>) -> Self {
        let models = raw
            .unwrap_or_default()
            .split(',')
            .map(|entry| entry.trim().to_ascii_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();

        Self { models }
    }

    /// Whether no restriction is in force.
    pub fn is_unrestricted(&self) -> bool {
        self.models.is_empty()
    }

    /// Whether the given model name (or alias) may be served.
    pub fn allows(&self, model: &str) -> bool {
        self.is_unrestricted() || self.models.iter().any(|m| m.eq_ignore_ascii_case(model))
    }

    /// The raw entries, for error messages naming the allow-list.
    pub fn entries(&self) -> &[String] {
        &self.models
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
