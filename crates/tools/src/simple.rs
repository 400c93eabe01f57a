//! Single request/response tool execution.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use conversation::{TokenBudget, TurnData, build_history, prepare_file_content};
use llm::{GenerationRequest, ToolCategory};

use crate::base::{
    self, CommonFields, Tool, ToolAnnotations, ToolError, validate_absolute_paths,
};
use crate::environment::ToolEnv;
use crate::output::ToolOutput;

/// Request shape shared by simple tools.
#[derive(Debug, Deserialize)]
pub struct SimpleRequest {
    pub prompt: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(flatten)]
    pub(crate) common: CommonFields,
}

/// What a simple tool contributes on top of the shared runner.
pub trait SimpleTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn system_prompt(&self) -> &'static str;

    fn category(&self) -> ToolCategory {
        ToolCategory::Balanced
    }

    fn default_temperature(&self) -> f32 {
        0.5
    }

    /// Extra schema fields beyond prompt/files/common.
    fn tool_fields(&self) -> serde_json::Map<String, Value> {
        serde_json::Map::new()
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["prompt"]
    }

    /// Tool-specific guidance folded into the websearch instruction.
    fn websearch_guidance(&self) -> Option<&'static str> {
        None
    }

    /// Post-process the model output before it is returned.
    fn format_response(&self, response: &str, _request: &SimpleRequest) -> String {
        response.to_string()
    }
}

/// Adapts a [`SimpleTool`] to the dispatchable [`Tool`] contract.
pub struct SimpleRunner<T> {
    tool: T,
}

impl<T: SimpleTool> SimpleRunner<T> {
    pub fn new(tool: T) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl<T: SimpleTool> Tool for SimpleRunner<T> {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    fn description(&self) -> &'static str {
        self.tool.description()
    }

    fn category(&self) -> ToolCategory {
        self.tool.category()
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations { read_only: false }
    }

    fn input_schema(&self, env: &ToolEnv) -> Value {
        crate::schema::build_simple_schema(env, self.tool.tool_fields(), self.tool.required_fields(), true)
    }

    async fn execute(&self, env: &ToolEnv, arguments: Value) -> ToolOutput {
        match self.run(env, arguments).await {
            Ok(output) => output,
            Err(error) => error.into(),
        }
    }
}

impl<T: SimpleTool> SimpleRunner<T> {
    async fn run(&self, env: &ToolEnv, arguments: Value) -> Result<ToolOutput, ToolError> {
        validate_absolute_paths(&arguments)?;

        let mut request: SimpleRequest = serde_json::from_value(arguments)
            .map_err(|e| ToolError::Validation(format!("Invalid request for '{}': {e}", self.tool.name())))?;

        // A file named prompt.txt replaces the inline prompt.
        let (prompt_from_file, remaining_files) = base::handle_prompt_file(&request.files);
        request.files = remaining_files;
        let user_content = prompt_from_file.unwrap_or_else(|| request.prompt.clone());

        if let Some(gate) = base::check_prompt_size(env, &user_content) {
            return Ok(gate);
        }

        let resolution = base::resolve_model(env, request.common.model.as_deref())?;
        let capability = resolution.capability.clone();

        base::validate_images(&request.common.images, &capability)?;

        let mut warnings = Vec::new();

        let (temperature, warning) =
            base::validate_temperature(request.common.temperature, self.tool.default_temperature(), &capability);
        warnings.extend(warning);

        let (thinking_mode, warning) =
            base::validate_thinking_mode(request.common.thinking_mode.as_deref(), &capability);
        warnings.extend(warning);

        let budget = TokenBudget::for_model(&capability);

        // Continuation: reuse the live thread, or start fresh when the id is
        // stale and say so.
        let mut thread_id = None;
        let mut history_text = String::new();
        let mut history_file_tokens = 0usize;
        let mut continuation_warning = None;

        if let Some(raw_id) = &request.common.continuation_id {
            let id = Uuid::parse_str(raw_id)
                .map_err(|_| ToolError::Validation(format!("Invalid continuation_id: '{raw_id}'")))?;

            match env.store.get_thread(id) {
                Some(thread) => {
                    let history = build_history(&env.store, &thread, &capability);
                    history_text = history.text;
                    history_file_tokens = history.file_tokens;
                    thread_id = Some(id);
                }
                None => {
                    log::warn!("Continuation thread {id} expired or unknown, starting a fresh thread");
                    continuation_warning =
                        Some("continuation_id was expired or unknown; a fresh thread was created".to_string());
                    thread_id = Some(env.store.create_thread(
                        self.tool.name(),
                        serde_json::Map::new(),
                        None,
                    ));
                }
            }
        }

        let file_budget = budget.files.saturating_sub(history_file_tokens);
        let prepared = prepare_file_content(&env.store, thread_id, &request.files, file_budget, "CONTEXT FILES")?;

        let mut prompt = String::new();

        if !history_text.is_empty() {
            prompt.push_str(&history_text);
            prompt.push_str("\n\n");
        }

        if !prepared.content.is_empty() {
            prompt.push_str(&prepared.content);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "=== USER REQUEST ===\n{user_content}\n=== END REQUEST ===\n\nPlease provide a thoughtful, \
             comprehensive response:"
        ));

        let system_prompt = format!(
            "{}{}{}",
            self.tool.system_prompt(),
            base::websearch_instruction(request.common.use_websearch, self.tool.websearch_guidance()),
            base::locale_instruction(env),
        );

        let generation = GenerationRequest {
            prompt,
            model: capability.name.clone(),
            system_prompt: Some(system_prompt),
            temperature,
            max_output_tokens: None,
            thinking_mode,
            images: request.common.images.clone(),
            json_schema: None,
        };

        let response = resolution.provider.generate(generation).await?;
        let formatted = self.tool.format_response(&response.content, &request);

        let mut output = if let Some(id) = thread_id {
            let recorded = env.store.add_turn(
                id,
                conversation::Role::User,
                TurnData {
                    content: user_content,
                    files: prepared.included.clone(),
                    images: request.common.images.clone(),
                    tool_name: Some(self.tool.name().to_string()),
                    ..Default::default()
                },
            );

            if recorded {
                env.store.add_turn(
                    id,
                    conversation::Role::Assistant,
                    TurnData {
                        content: formatted.clone(),
                        tool_name: Some(self.tool.name().to_string()),
                        provider: Some(response.provider),
                        model_name: Some(response.model_name.clone()),
                        ..Default::default()
                    },
                );
            }

            let mut output = ToolOutput::success(formatted).with_continuation(id.to_string());
            output.status = "continuation_available".to_string();
            output
        } else {
            ToolOutput::success(formatted)
        };

        output = output
            .with_metadata("tool_name", self.tool.name())
            .with_metadata("model_name", response.model_name.clone())
            .with_metadata("friendly_name", response.friendly_name.clone())
            .with_metadata("provider", response.provider.as_str());

        if let Some(usage) = &response.usage {
            if let Ok(value) = serde_json::to_value(usage) {
                output.metadata.insert("usage".to_string(), value);
            }
        }

        if let Some(warning) = continuation_warning {
            warnings.push(warning);
        }

        if !warnings.is_empty() {
            output.metadata.insert("warnings".to_string(), warnings.into());
        }

        Ok(output)
    }
}
