//! Conclave configuration, snapshotted from the process environment at startup.
//!
//! The environment is read exactly once via [`Config::from_env`]; every other
//! component receives a reference to the resulting snapshot. Changing provider
//! keys or restriction lists requires a restart.

#![deny(missing_docs)]

mod providers;

use std::env;

pub use providers::{
    ApiKeySettings, CustomSettings, DialSettings, ProviderKind, ProviderSettings, RestrictionList,
};

/// Sentinel model name that defers model selection to the calling agent.
pub const AUTO_MODEL: &str = "auto";

/// Default cap on the size of a caller-supplied prompt, in characters.
///
/// Prompts larger than this must be resent as a `prompt.txt` file so they ride
/// the file-embedding path instead of the MCP request body.
pub const DEFAULT_PROMPT_SIZE_LIMIT: usize = 50_000;

/// Main configuration for the Conclave process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model used when the tool caller omits one. `"auto"` forces the caller
    /// to pick a model explicitly on tools that need one.
    pub default_model: String,
    /// Optional locale; when set, system prompts instruct models to answer in
    /// this language.
    pub locale: Option<String>,
    /// Conversation store limits.
    pub conversation: ConversationConfig,
    /// Prompt-size gate threshold in characters.
    pub prompt_size_limit: usize,
    /// Per-provider credentials and restriction lists.
    pub providers: ProviderSettings,
    /// stderr log verbosity, consumed by the logger at bootstrap.
    pub log_level: String,
}

/// Limits for the in-memory conversation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Thread time-to-live in hours, measured from the last update.
    pub timeout_hours: u64,
    /// Maximum number of turns per thread.
    pub max_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            timeout_hours: 3,
            max_turns: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: AUTO_MODEL.to_string(),
            locale: None,
            conversation: ConversationConfig::default(),
            prompt_size_limit: DEFAULT_PROMPT_SIZE_LIMIT,
            providers: ProviderSettings::default(),
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Snapshot the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Tests use this with a closure over a map so they never mutate global
    /// process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_model = non_empty(lookup("DEFAULT_MODEL")).unwrap_or_else(|| AUTO_MODEL.to_string());
        let locale = non_empty(lookup("LOCALE"));
        let log_level = non_empty(lookup("LOG_LEVEL")).unwrap_or_else(|| "INFO".to_string());

        let conversation = ConversationConfig {
            timeout_hours: parse_or_default(lookup("CONVERSATION_TIMEOUT_HOURS"), 3),
            max_turns: parse_or_default(lookup("MAX_CONVERSATION_TURNS"), 50),
        };

        Self {
            default_model,
            locale,
            conversation,
            prompt_size_limit: DEFAULT_PROMPT_SIZE_LIMIT,
            providers: ProviderSettings::from_lookup(&lookup),
            log_level,
        }
    }

    /// Whether the caller must name a model on every tool call.
    pub fn is_auto_mode(&self) -> bool {
        self.default_model.eq_ignore_ascii_case(AUTO_MODEL)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or_default<T: std::str::FromStr + Copy>(value: Option<String>, default: T) -> T {
    let Some(raw) = non_empty(value) else {
        return default;
    };

    match raw.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            log::warn!("Ignoring unparsable configuration value '{raw}', using default");
            default
        }
    }
}
