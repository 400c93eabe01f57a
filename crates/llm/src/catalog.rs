//! Static model capability catalog.
//!
//! Each provider kind registers a fixed table of the models it serves. The
//! tables are immutable after first access; the only dynamic source is the
//! user-supplied JSON registry for the custom provider.

use std::path::Path;
use std::sync::OnceLock;

use config::ProviderKind;
use serde::Deserialize;

/// How a model constrains its sampling temperature.
#[derive(Debug, Clone, PartialEq)]
pub enum TemperatureConstraint {
    /// The model only accepts one value (reasoning models).
    Fixed(f32),
    /// Any value within the inclusive range.
    Range { min: f32, max: f32 },
    /// Only the listed values.
    Discrete(Vec<f32>),
}

impl TemperatureConstraint {
    /// Correct a requested temperature against the constraint.
    ///
    /// Returns the usable value plus a warning when the request was adjusted.
    pub fn correct(&self, requested: f32) -> (f32, Option<String>) {
        match self {
            TemperatureConstraint::Fixed(value) => {
                if (requested - value).abs() < f32::EPSILON {
                    (*value, None)
                } else {
                    (
                        *value,
                        Some(format!(
                            "temperature {requested} overridden to fixed value {value}"
                        )),
                    )
                }
            }
            TemperatureConstraint::Range { min, max } => {
                let clamped = requested.clamp(*min, *max);
                if clamped == requested {
                    (clamped, None)
                } else {
                    (
                        clamped,
                        Some(format!(
                            "temperature {requested} clamped to [{min}, {max}]"
                        )),
                    )
                }
            }
            TemperatureConstraint::Discrete(values) => {
                let nearest = values
                    .iter()
                    .copied()
                    .min_by(|a, b| {
                        (a - requested)
                            .abs()
                            .partial_cmp(&(b - requested).abs())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(requested);

                if (nearest - requested).abs() < f32::EPSILON {
                    (nearest, None)
                } else {
                    (
                        nearest,
                        Some(format!(
                            "temperature {requested} adjusted to nearest allowed value {nearest}"
                        )),
                    )
                }
            }
        }
    }
}

/// Declarative metadata for one model. Immutable after registration.
#[derive(Debug, Clone)]
pub struct ModelCapability {
    /// Canonical model name, as sent on the wire.
    pub name: String,
    /// Human-readable name for response metadata.
    pub friendly_name: String,
    /// Shorthand names accepted from callers.
    pub aliases: Vec<String>,
    /// The provider kind that serves this model.
    pub provider: ProviderKind,
    /// Total context window in tokens.
    pub context_window: usize,
    /// Maximum response tokens.
    pub max_output_tokens: usize,
    /// Whether the model accepts a thinking budget.
    pub supports_thinking: bool,
    /// Maximum thinking tokens, meaningful when `supports_thinking`.
    pub max_thinking_tokens: usize,
    /// Temperature rules.
    pub temperature: TemperatureConstraint,
    /// Whether images may be attached.
    pub supports_images: bool,
    /// Per-image decoded size limit in megabytes.
    pub max_image_size_mb: f64,
    /// Whether structured JSON output is supported.
    pub supports_json_mode: bool,
    /// Whether a separate system prompt is supported.
    pub supports_system_prompt: bool,
    /// One-line description surfaced in tool schemas.
    pub description: String,
}

impl ModelCapability {
    /// Whether `candidate` names this model, canonically or via alias.
    pub fn matches(&self, candidate: &str) -> bool {
        self.name.eq_ignore_ascii_case(candidate)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(candidate))
    }
}

/// An immutable set of model capabilities for one provider kind.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: Vec<ModelCapability>,
}

impl Catalog {
    /// Build a catalog from explicit capability entries.
    pub fn new(models: Vec<ModelCapability>) -> Self {
        Self { models }
    }

    /// The built-in table for a provider kind.
    ///
    /// OpenRouter and custom models resolve against empty built-ins; their
    /// providers fall back to [`Catalog::generic_capability`] or a registry
    /// file.
    pub fn builtin(kind: ProviderKind) -> &'static Catalog {
        match kind {
            ProviderKind::Google => google_catalog(),
            ProviderKind::Openai => openai_catalog(),
            ProviderKind::Xai => xai_catalog(),
            ProviderKind::Dial => dial_catalog(),
            ProviderKind::Openrouter => openrouter_catalog(),
            ProviderKind::Custom => empty_catalog(),
        }
    }

    /// Resolve an alias (or canonical name) to the canonical model name.
    pub fn resolve_alias(&self, name: &str) -> Option<&str> {
        self.capabilities(name).map(|m| m.name.as_str())
    }

    /// Look up capabilities by canonical name or alias.
    pub fn capabilities(&self, name: &str) -> Option<&ModelCapability> {
        self.models.iter().find(|m| m.matches(name))
    }

    /// Canonical names of every model in the catalog.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// All entries, for schema and error-message assembly.
    pub fn entries(&self) -> &[ModelCapability] {
        &self.models
    }

    /// Whether the named model supports a thinking budget.
    pub fn is_thinking_capable(&self, name: &str) -> bool {
        self.capabilities(name).is_some_and(|m| m.supports_thinking)
    }

    /// Load a catalog from a user-supplied JSON registry file.
    pub fn from_registry_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let registry: RegistryFile = serde_json::from_str(&raw)?;

        let models = registry
            .models
            .into_iter()
            .map(|entry| entry.into_capability(ProviderKind::Custom))
            .collect();

        Ok(Self { models })
    }

    /// Permissive default for models the catalog does not know, used by the
    /// aggregator providers.
    pub fn generic_capability(name: &str, provider: ProviderKind) -> ModelCapability {
        ModelCapability {
            name: name.to_string(),
            friendly_name: name.to_string(),
            aliases: Vec::new(),
            provider,
            context_window: 128_000,
            max_output_tokens: 32_768,
            supports_thinking: false,
            max_thinking_tokens: 0,
            temperature: TemperatureConstraint::Range { min: 0.0, max: 2.0 },
            supports_images: false,
            max_image_size_mb: 0.0,
            supports_json_mode: false,
            supports_system_prompt: true,
            description: format!("{name} (capabilities assumed, not declared)"),
        }
    }
}

/// Wire format of the custom-provider registry file.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    models: Vec<RegistryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryEntry {
    name: String,
    #[serde(default)]
    friendly_name: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    context_window: usize,
    max_output_tokens: usize,
    #[serde(default)]
    supports_thinking: bool,
    #[serde(default)]
    max_thinking_tokens: usize,
    #[serde(default)]
    temperature_range: Option<[f32; 2]>,
    #[serde(default)]
    fixed_temperature: Option<f32>,
    #[serde(default)]
    allowed_temperatures: Option<Vec<f32>>,
    #[serde(default)]
    supports_images: bool,
    #[serde(default)]
    max_image_size_mb: f64,
    #[serde(default)]
    supports_json_mode: bool,
    #[serde(default = "default_true")]
    supports_system_prompt: bool,
    #[serde(default)]
    description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl RegistryEntry {
    fn into_capability(self, provider: ProviderKind) -> ModelCapability {
        let temperature = if let Some(fixed) = self.fixed_temperature {
            TemperatureConstraint::Fixed(fixed)
        } else if let Some(values) = self.allowed_temperatures {
            TemperatureConstraint::Discrete(values)
        } else {
            let [min, max] = self.temperature_range.unwrap_or([0.0, 2.0]);
            TemperatureConstraint::Range { min, max }
        };

        ModelCapability {
            friendly_name: self.friendly_name.unwrap_or_else(|| self.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| format!("{} (user-declared)", self.name)),
            name: self.name,
            aliases: self.aliases,
            provider,
            context_window: self.context_window,
            max_output_tokens: self.max_output_tokens,
            supports_thinking: self.supports_thinking,
            max_thinking_tokens: self.max_thinking_tokens,
            temperature,
            supports_images: self.supports_images,
            max_image_size_mb: self.max_image_size_mb,
            supports_json_mode: self.supports_json_mode,
            supports_system_prompt: self.supports_system_prompt,
        }
    }
}

fn model(
    name: &str,
    friendly_name: &str,
    aliases: &[&str],
    provider: ProviderKind,
    context_window: usize,
    max_output_tokens: usize,
    description: &str,
) -> ModelCapability {
    ModelCapability {
        name: name.to_string(),
        friendly_name: friendly_name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        provider,
        context_window,
        max_output_tokens,
        supports_thinking: false,
        max_thinking_tokens: 0,
        temperature: TemperatureConstraint::Range { min: 0.0, max: 2.0 },
        supports_images: false,
        max_image_size_mb: 0.0,
        supports_json_mode: true,
        supports_system_prompt: true,
        description: description.to_string(),
    }
}

fn google_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();

    CATALOG.get_or_init(|| {
        let mut pro = model(
            "gemini-2.5-pro",
            "Gemini 2.5 Pro",
            &["pro", "gemini-pro"],
            ProviderKind::Google,
            1_048_576,
            65_536,
            "Deep reasoning with a 1M context window, for complex analysis",
        );
        pro.supports_thinking = true;
        pro.max_thinking_tokens = 32_768;
        pro.supports_images = true;
        pro.max_image_size_mb = 20.0;

        let mut flash = model(
            "gemini-2.5-flash",
            "Gemini 2.5 Flash",
            &["flash", "gemini-flash"],
            ProviderKind::Google,
            1_048_576,
            65_536,
            "Fast responses with a 1M context window, for quick iteration",
        );
        flash.supports_thinking = true;
        flash.max_thinking_tokens = 24_576;
        flash.supports_images = true;
        flash.max_image_size_mb = 20.0;

        Catalog::new(vec![pro, flash])
    })
}

fn openai_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();

    CATALOG.get_or_init(|| {
        let mut o3 = model(
            "o3",
            "OpenAI o3",
            &[],
            ProviderKind::Openai,
            200_000,
            100_000,
            "Strong logical reasoning for debugging and systematic analysis",
        );
        o3.temperature = TemperatureConstraint::Fixed(1.0);
        o3.supports_images = true;
        o3.max_image_size_mb = 20.0;

        let mut o3_mini = model(
            "o3-mini",
            "OpenAI o3-mini",
            &["o3mini"],
            ProviderKind::Openai,
            200_000,
            65_536,
            "Balanced reasoning at lower cost",
        );
        o3_mini.temperature = TemperatureConstraint::Fixed(1.0);

        let mut o4_mini = model(
            "o4-mini",
            "OpenAI o4-mini",
            &["o4mini", "mini"],
            ProviderKind::Openai,
            200_000,
            100_000,
            "Latest fast reasoning model, good for quick analysis",
        );
        o4_mini.temperature = TemperatureConstraint::Fixed(1.0);
        o4_mini.supports_images = true;
        o4_mini.max_image_size_mb = 20.0;

        let mut gpt41 = model(
            "gpt-4.1",
            "GPT-4.1",
            &["gpt4.1"],
            ProviderKind::Openai,
            1_000_000,
            32_768,
            "Large-context generalist for broad code understanding",
        );
        gpt41.supports_images = true;
        gpt41.max_image_size_mb = 20.0;

        Catalog::new(vec![o3, o3_mini, o4_mini, gpt41])
    })
}

fn xai_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();

    CATALOG.get_or_init(|| {
        let grok3 = model(
            "grok-3",
            "Grok 3",
            &["grok", "grok3"],
            ProviderKind::Xai,
            131_072,
            32_768,
            "X.AI flagship for general reasoning",
        );

        let grok3_fast = model(
            "grok-3-fast",
            "Grok 3 Fast",
            &["grokfast", "grok3fast"],
            ProviderKind::Xai,
            131_072,
            32_768,
            "Latency-optimized Grok 3 variant",
        );

        Catalog::new(vec![grok3, grok3_fast])
    })
}

fn dial_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();

    // DIAL deployments mirror their upstream models; only the transport
    // differs, so the windows track the native tables.
    CATALOG.get_or_init(|| {
        let mut o3 = model(
            "o3-2025-04-16",
            "o3 (DIAL)",
            &["dial-o3"],
            ProviderKind::Dial,
            200_000,
            100_000,
            "o3 served through a DIAL deployment",
        );
        o3.temperature = TemperatureConstraint::Fixed(1.0);

        let mut pro = model(
            "gemini-2.5-pro-preview-05-06",
            "Gemini 2.5 Pro (DIAL)",
            &["dial-pro"],
            ProviderKind::Dial,
            1_048_576,
            65_536,
            "Gemini 2.5 Pro served through a DIAL deployment",
        );
        pro.supports_thinking = true;
        pro.max_thinking_tokens = 32_768;

        let mut flash = model(
            "gemini-2.5-flash-preview-05-20",
            "Gemini 2.5 Flash (DIAL)",
            &["dial-flash"],
            ProviderKind::Dial,
            1_048_576,
            65_536,
            "Gemini 2.5 Flash served through a DIAL deployment",
        );
        flash.supports_thinking = true;
        flash.max_thinking_tokens = 24_576;

        Catalog::new(vec![o3, pro, flash])
    })
}

fn openrouter_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();

    // Aliases for the handful of models agents reach for by shorthand.
    // Anything else passes through with vendor-prefixed names and generic
    // capabilities.
    CATALOG.get_or_init(|| {
        let mut opus = model(
            "anthropic/claude-opus-4",
            "Claude Opus 4",
            &["opus"],
            ProviderKind::Openrouter,
            200_000,
            32_768,
            "Anthropic's deepest reasoning model, via OpenRouter",
        );
        opus.supports_images = true;
        opus.max_image_size_mb = 5.0;

        let mut sonnet = model(
            "anthropic/claude-sonnet-4",
            "Claude Sonnet 4",
            &["sonnet"],
            ProviderKind::Openrouter,
            200_000,
            64_000,
            "Anthropic's balanced model, via OpenRouter",
        );
        sonnet.supports_images = true;
        sonnet.max_image_size_mb = 5.0;

        let deepseek = model(
            "deepseek/deepseek-r1",
            "DeepSeek R1",
            &["deepseek", "r1"],
            ProviderKind::Openrouter,
            128_000,
            32_768,
            "Open reasoning model, via OpenRouter",
        );

        Catalog::new(vec![opus, sonnet, deepseek])
    })
}

fn empty_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(Catalog::default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_names() {
        let catalog = Catalog::builtin(ProviderKind::Google);

        assert_eq!(catalog.resolve_alias("flash"), Some("gemini-2.5-flash"));
        assert_eq!(catalog.resolve_alias("PRO"), Some("gemini-2.5-pro"));
        assert_eq!(catalog.resolve_alias("gemini-2.5-pro"), Some("gemini-2.5-pro"));
        assert_eq!(catalog.resolve_alias("unknown"), None);
    }

    #[test]
    fn thinking_capability_follows_the_table() {
        let google = Catalog::builtin(ProviderKind::Google);
        let openai = Catalog::builtin(ProviderKind::Openai);

        assert!(google.is_thinking_capable("flash"));
        assert!(!openai.is_thinking_capable("o3"));
        assert!(!google.is_thinking_capable("missing"));
    }

    #[test]
    fn o_series_models_have_fixed_temperature() {
        let catalog = Catalog::builtin(ProviderKind::Openai);
        let o3 = catalog.capabilities("o3").unwrap();

        assert_eq!(o3.temperature, TemperatureConstraint::Fixed(1.0));
    }

    #[test]
    fn fixed_constraint_overrides_with_warning() {
        let constraint = TemperatureConstraint::Fixed(1.0);

        let (value, warning) = constraint.correct(0.2);
        assert_eq!(value, 1.0);
        assert!(warning.unwrap().contains("overridden"));

        let (_, warning) = constraint.correct(1.0);
        assert!(warning.is_none());
    }

    #[test]
    fn range_constraint_clamps() {
        let constraint = TemperatureConstraint::Range { min: 0.0, max: 2.0 };

        assert_eq!(constraint.correct(2.5), (2.0, Some("temperature 2.5 clamped to [0, 2]".to_string())));
        assert_eq!(constraint.correct(0.7), (0.7, None));
    }

    #[test]
    fn discrete_constraint_picks_nearest() {
        let constraint = TemperatureConstraint::Discrete(vec![0.0, 0.5, 1.0]);

        let (value, warning) = constraint.correct(0.6);
        assert_eq!(value, 0.5);
        assert!(warning.is_some());
    }

    #[test]
    fn generic_capability_assumes_a_large_window() {
        let capability = Catalog::generic_capability("vendor/new-model", ProviderKind::Openrouter);

        assert_eq!(capability.context_window, 128_000);
        assert!(!capability.supports_images);
        assert!(capability.supports_system_prompt);
    }

    #[test]
    fn registry_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "models": [
                    {{
                        "name": "llama-3.2",
                        "aliases": ["local-llama"],
                        "context_window": 128000,
                        "max_output_tokens": 64000,
                        "supports_json_mode": true
                    }}
                ]
            }}"#
        )
        .unwrap();

        let catalog = Catalog::from_registry_file(file.path()).unwrap();
        let capability = catalog.capabilities("local-llama").unwrap();

        assert_eq!(capability.name, "llama-3.2");
        assert_eq!(capability.provider, ProviderKind::Custom);
        assert_eq!(capability.context_window, 128_000);
        assert_eq!(capability.temperature, TemperatureConstraint::Range { min: 0.0, max: 2.0 });
    }

    #[test]
    fn registry_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"models": [{{"name": "m", "context_window": 1, "max_output_tokens": 1, "surprise": true}}]}}"#
        )
        .unwrap();

        assert!(Catalog::from_registry_file(file.path()).is_err());
    }
}
