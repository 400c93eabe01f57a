//! The shared tool contract and the validation helpers every tool runs
//! through before touching a provider.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use conversation::is_absolute_path;
use llm::{LlmError, ModelCapability, ModelResolution, ThinkingMode, ToolCategory};

use crate::environment::ToolEnv;
use crate::output::ToolOutput;

/// Fields accepted by every model-backed tool, flattened into each tool's
/// request shape.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct CommonFields {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub thinking_mode: Option<String>,
    #[serde(default = "default_true")]
    pub use_websearch: bool,
    pub continuation_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// MCP tool annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolAnnotations {
    /// Workflow tools analyze without modifying the environment.
    pub read_only: bool,
}

/// Errors raised inside tool execution. The MCP shell converts every variant
/// into a `{status: "error"}` payload; nothing propagates past it.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("All file paths must be absolute. Received: {0}")]
    RelativePath(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<conversation::ConversationError> for ToolError {
    fn from(error: conversation::ConversationError) -> Self {
        match error {
            conversation::ConversationError::RelativePath(path) => ToolError::RelativePath(path),
        }
    }
}

impl From<ToolError> for ToolOutput {
    fn from(error: ToolError) -> Self {
        let message = match &error {
            ToolError::Llm(llm) => llm.client_message(),
            other => other.to_string(),
        };

        ToolOutput::error(message)
    }
}

/// The uniform surface the MCP shell dispatches against.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Model class preferred when the engine picks a fallback.
    fn category(&self) -> ToolCategory {
        ToolCategory::Balanced
    }

    /// Whether this tool resolves and calls a model at all. Data-transform
    /// tools (planner, challenge) return false and bypass resolution.
    fn requires_model(&self) -> bool {
        true
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::default()
    }

    fn input_schema(&self, env: &ToolEnv) -> Value;

    async fn execute(&self, env: &ToolEnv, arguments: Value) -> ToolOutput;
}

/// Field names whose values carry filesystem paths.
///
/// Any field named exactly one of these, or ending in `_files`, is validated
/// recursively through the whole argument object.
fn is_path_field(name: &str) -> bool {
    matches!(name, "files" | "relevant_files" | "files_checked") || name.ends_with("_files")
}

/// Enforce the absolute-path contract over raw arguments.
///
/// Runs before deserialization so the check covers every tool-specific shape
/// without per-tool code. `images` entries may alternatively be data URLs.
pub(crate) fn validate_absolute_paths(arguments: &Value) -> Result<(), ToolError> {
    fn walk(value: &Value) -> Result<(), ToolError> {
        let Value::Object(map) = value else {
            return Ok(());
        };

        for (key, entry) in map {
            if is_path_field(key) {
                check_entries(entry, false)?;
            } else if key == "images" {
                check_entries(entry, true)?;
            }

            match entry {
                Value::Object(_) => walk(entry)?,
                Value::Array(items) => {
                    for item in items {
                        walk(item)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn check_entries(entry: &Value, allow_data_urls: bool) -> Result<(), ToolError> {
        let Value::Array(items) = entry else {
            return Ok(());
        };

        for item in items {
            let Value::String(path) = item else {
                continue;
            };

            if allow_data_urls && path.starts_with("data:") {
                continue;
            }

            if !is_absolute_path(path) {
                return Err(ToolError::RelativePath(path.clone()));
            }
        }

        Ok(())
    }

    walk(arguments)
}

/// Resolve the model for a tool call, honoring the auto-mode gate.
///
/// The sentinel `auto` (from the caller or `DEFAULT_MODEL`) is a structured
/// error naming every available model; agents must choose deliberately.
pub(crate) fn resolve_model(env: &ToolEnv, requested: Option<&str>) -> Result<ModelResolution, ToolError> {
    let name = requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&env.config.default_model);

    if name.eq_ignore_ascii_case(config::AUTO_MODEL) {
        return Err(ToolError::Llm(LlmError::ModelUnavailable {
            requested: name.to_string(),
            detail: format!("Available models: {}", env.registry.available_model_summary()),
        }));
    }

    Ok(env.registry.resolve(name)?)
}

/// Validate and correct the requested temperature against the model.
///
/// Returns the usable value plus an optional warning for response metadata.
pub(crate) fn validate_temperature(
    requested: Option<f32>,
    default: f32,
    capability: &ModelCapability,
) -> (f32, Option<String>) {
    let requested = requested.unwrap_or(default);
    let (corrected, warning) = capability.temperature.correct(requested);

    if let Some(warning) = &warning {
        log::warn!("Model '{}': {warning}", capability.name);
    }

    (corrected, warning)
}

/// Parse and gate the thinking mode against the model's capability.
pub(crate) fn validate_thinking_mode(
    requested: Option<&str>,
    capability: &ModelCapability,
) -> (Option<ThinkingMode>, Option<String>) {
    let Some(raw) = requested else {
        return (None, None);
    };

    let Some(mode) = ThinkingMode::parse(raw) else {
        return (
            None,
            Some(format!("unknown thinking_mode '{raw}' ignored (expected minimal|low|medium|high|max)")),
        );
    };

    if !capability.supports_thinking {
        let warning = format!("thinking_mode '{raw}' ignored: {} has no thinking budget", capability.name);
        log::warn!("{warning}");
        return (None, Some(warning));
    }

    (Some(mode), None)
}

/// Maximum images accepted per request regardless of model.
const MAX_IMAGES_PER_REQUEST: usize = 5;

/// Validate image count and per-image decoded size against the model.
pub(crate) fn validate_images(images: &[String], capability: &ModelCapability) -> Result<(), ToolError> {
    if images.is_empty() {
        return Ok(());
    }

    if !capability.supports_images {
        return Err(ToolError::Validation(format!(
            "Model '{}' does not support images, but {} image(s) were provided",
            capability.name,
            images.len()
        )));
    }

    if images.len() > MAX_IMAGES_PER_REQUEST {
        return Err(ToolError::Validation(format!(
            "Too many images: {} provided, limit is {MAX_IMAGES_PER_REQUEST}",
            images.len()
        )));
    }

    let limit_bytes = (capability.max_image_size_mb * 1024.0 * 1024.0) as u64;

    for image in images {
        let size = decoded_image_size(image);

        if size > limit_bytes {
            return Err(ToolError::Validation(format!(
                "Image '{}' is {:.1} MB, exceeding the {:.1} MB limit for model '{}'",
                display_name(image),
                size as f64 / (1024.0 * 1024.0),
                capability.max_image_size_mb,
                capability.name
            )));
        }
    }

    Ok(())
}

fn decoded_image_size(image: &str) -> u64 {
    if let Some(index) = image.find(";base64,") {
        // Base64 expands 3 bytes to 4 characters.
        let payload = image.len() - index - ";base64,".len();
        return (payload as u64 / 4) * 3;
    }

    std::fs::metadata(image).map(|meta| meta.len()).unwrap_or(0)
}

fn display_name(image: &str) -> &str {
    if image.starts_with("data:") { "<data url>" } else { image }
}

/// The prompt-size gate: oversized prompts must be resent as a file so they
/// ride the embedding path instead of the MCP transport.
pub(crate) fn check_prompt_size(env: &ToolEnv, text: &str) -> Option<ToolOutput> {
    if text.len() <= env.config.prompt_size_limit {
        return None;
    }

    let mut output = ToolOutput::error(
        "The prompt is too large for MCP's transport limits. Please save the prompt text to a \
         file named 'prompt.txt' and resend the request, passing the file's absolute path in the \
         'files' parameter instead. This lets the prompt ride the file-embedding path.",
    );
    output.status = "requires_file_prompt".to_string();
    output.metadata.insert("prompt_size".to_string(), text.len().into());
    output
        .metadata
        .insert("prompt_size_limit".to_string(), env.config.prompt_size_limit.into());

    Some(output)
}

/// Extract a `prompt.txt` / `prompt.md` file from the file list, returning
/// its contents as the effective prompt and the remaining files.
pub(crate) fn handle_prompt_file(files: &[String]) -> (Option<String>, Vec<String>) {
    let mut prompt = None;
    let mut remaining = Vec::with_capacity(files.len());

    for path in files {
        let name = std::path::Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if prompt.is_none() && matches!(name, "prompt.txt" | "prompt.md") {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    prompt = Some(content);
                    continue;
                }
                Err(e) => {
                    log::warn!("Failed to read prompt file '{path}': {e}");
                }
            }
        }

        remaining.push(path.clone());
    }

    (prompt, remaining)
}

/// Instruction appended to system prompts when web search is enabled.
pub(crate) fn websearch_instruction(enabled: bool, guidance: Option<&str>) -> String {
    if !enabled {
        return String::new();
    }

    let mut instruction = String::from(
        "\n\nWEB SEARCH: You may request web searches when current documentation, community \
         insight or recent changes would strengthen the answer. When a search would help, ask \
         the agent to run it and share the results back in the next message.",
    );

    if let Some(guidance) = guidance {
        instruction.push('\n');
        instruction.push_str(guidance);
    }

    instruction
}

/// Locale directive appended to every system prompt when `LOCALE` is set.
pub(crate) fn locale_instruction(env: &ToolEnv) -> String {
    match &env.config.locale {
        Some(locale) => format!("\n\nAlways respond in {locale}."),
        None => String::new(),
    }
}
