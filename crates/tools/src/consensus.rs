//! Multi-model consensus with stance steering.
//!
//! Fan-out is sequential by design: deterministic ordering, simple
//! rate-limit behavior, and responses collected in caller order.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use conversation::{TokenBudget, TurnData, build_history, prepare_file_content};
use llm::{GenerationRequest, ModelResolution, ThinkingMode, ToolCategory};

use crate::base::{self, CommonFields, Tool, ToolAnnotations, ToolError, validate_absolute_paths};
use crate::environment::ToolEnv;
use crate::output::ToolOutput;
use crate::prompts;

/// Maximum instances of the same `(model, stance)` pair per request.
const MAX_INSTANCES_PER_COMBINATION: usize = 2;

#[derive(Debug, Clone, Deserialize)]
struct ModelEntry {
    model: String,
    #[serde(default)]
    stance: Option<String>,
    #[serde(default)]
    stance_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConsensusRequest {
    prompt: String,
    models: Vec<ModelEntry>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    focus_areas: Vec<String>,
    #[serde(flatten)]
    common: CommonFields,
}

/// Gathers perspectives from several models on one proposal, each steered by
/// a supportive, critical, or neutral stance.
pub struct ConsensusTool;

impl ConsensusTool {
    /// Map stance synonyms to the canonical three.
    fn normalize_stance(stance: Option<&str>) -> String {
        let raw = stance.unwrap_or("neutral").to_ascii_lowercase();

        match raw.as_str() {
            "for" | "support" | "favor" => "for".to_string(),
            "against" | "oppose" | "critical" => "against".to_string(),
            "neutral" => "neutral".to_string(),
            other => {
                log::warn!("Unknown stance '{other}', defaulting to 'neutral'");
                "neutral".to_string()
            }
        }
    }

    /// Enforce the duplicate-combination limit, returning the surviving
    /// entries (stances normalized) and a note per skipped entry.
    fn validate_combinations(entries: &[ModelEntry]) -> (Vec<ModelEntry>, Vec<String>) {
        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        let mut valid = Vec::new();
        let mut skipped = Vec::new();

        for entry in entries {
            let stance = Self::normalize_stance(entry.stance.as_deref());
            let key = (entry.model.clone(), stance.clone());
            let count = counts.entry(key).or_insert(0);

            if *count >= MAX_INSTANCES_PER_COMBINATION {
                skipped.push(format!(
                    "{}:{stance} (max {MAX_INSTANCES_PER_COMBINATION} instances)",
                    entry.model
                ));
                continue;
            }

            *count += 1;
            valid.push(ModelEntry {
                model: entry.model.clone(),
                stance: Some(stance),
                stance_prompt: entry.stance_prompt.clone(),
            });
        }

        (valid, skipped)
    }

    /// Substitute the stance block into the base system prompt.
    ///
    /// The base prompt must carry exactly one `{stance_prompt}` placeholder;
    /// anything else is an authoring error caught here and in unit tests.
    fn stance_enhanced_prompt(stance: &str, custom: Option<&str>) -> Result<String, ToolError> {
        let base = prompts::CONSENSUS_PROMPT;

        if base.matches("{stance_prompt}").count() != 1 {
            return Err(ToolError::Validation(
                "Consensus system prompt must contain exactly one '{stance_prompt}' placeholder".to_string(),
            ));
        }

        let block = match custom {
            Some(custom) => custom.to_string(),
            None => prompts::stance_prompt(stance).to_string(),
        };

        Ok(base.replace("{stance_prompt}", &block))
    }

    fn entry_label(model: &str, stance: &str) -> String {
        if stance == "neutral" {
            model.to_string()
        } else {
            format!("{model}:{stance}")
        }
    }

    fn synthesis_guidance(successes: usize, failures: usize) -> String {
        if successes == 0 {
            return "No models provided successful responses. Please retry with different models or \
                    check the error messages for guidance."
                .to_string();
        }

        if successes == 1 {
            return "Only one model responded successfully. Synthesize from the available \
                    perspective and note where additional expert input would strengthen the \
                    conclusion."
                .to_string();
        }

        let mut guidance = String::from(
            "Synthesize these perspectives by first identifying the key points of agreement and \
             disagreement between the models. Then provide your final consolidated recommendation, \
             explaining how you weighed the different opinions, and address the most critical \
             risks each model raised with actionable next steps.",
        );

        if failures > 0 {
            guidance.push_str(&format!(
                " Note: {failures} model(s) failed to respond - treat this as partial consensus."
            ));
        }

        guidance
    }
}

#[async_trait]
impl Tool for ConsensusTool {
    fn name(&self) -> &'static str {
        "consensus"
    }

    fn description(&self) -> &'static str {
        "MULTI-MODEL CONSENSUS - Gather diverse perspectives from multiple AI models on technical \
         proposals, plans, and ideas. Perfect for validation, feasibility assessment, and complex \
         decisions. Supports stance steering: assign each model 'for', 'against', or 'neutral', \
         optionally with a custom stance prompt. Example: [{\"model\": \"o3\", \"stance\": \"for\"}, \
         {\"model\": \"flash\", \"stance\": \"against\"}]. Maximum 2 instances per model+stance \
         combination."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::ExtendedReasoning
    }

    /// Models arrive per-entry in `models`; the shared `model` field and its
    /// auto-mode gate do not apply.
    fn requires_model(&self) -> bool {
        false
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations { read_only: true }
    }

    fn input_schema(&self, env: &ToolEnv) -> Value {
        let mut fields = Map::new();

        fields.insert(
            "prompt".to_string(),
            json!({
                "type": "string",
                "description": "Description of what to get consensus on, testing objectives, and \
                                specific scope/focus areas. Be as detailed as possible about the \
                                proposal you want multiple perspectives on.",
            }),
        );

        fields.insert(
            "models".to_string(),
            json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "model": {
                            "type": "string",
                            "description": "Model name to consult (e.g. 'o3', 'flash', 'pro')",
                        },
                        "stance": {
                            "type": "string",
                            "enum": ["for", "support", "favor", "against", "oppose", "critical", "neutral"],
                            "default": "neutral",
                            "description": "Stance for this model: supportive ('for', 'support', \
                                            'favor'), critical ('against', 'oppose', 'critical'), \
                                            or 'neutral'.",
                        },
                        "stance_prompt": {
                            "type": "string",
                            "description": "Custom stance-specific instructions, used instead of \
                                            the default stance prompt.",
                        },
                    },
                    "required": ["model"],
                },
                "description": "Model configurations for the consensus. Each entry may carry a \
                                stance and custom stance instructions. Maximum 2 instances per \
                                model+stance combination.",
            }),
        );

        fields.insert(
            "focus_areas".to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "Specific aspects to focus on (e.g. 'performance', 'security').",
            }),
        );

        crate::schema::build_simple_schema(env, fields, &["prompt", "models"], false)
    }

    async fn execute(&self, env: &ToolEnv, arguments: Value) -> ToolOutput {
        match self.run(env, arguments).await {
            Ok(output) => output,
            Err(error) => error.into(),
        }
    }
}

impl ConsensusTool {
    async fn run(&self, env: &ToolEnv, arguments: Value) -> Result<ToolOutput, ToolError> {
        validate_absolute_paths(&arguments)?;

        let mut request: ConsensusRequest = serde_json::from_value(arguments)
            .map_err(|e| ToolError::Validation(format!("Invalid request for 'consensus': {e}")))?;

        if request.models.is_empty() {
            return Err(ToolError::Validation("At least one model must be specified".to_string()));
        }

        let (prompt_from_file, remaining) = base::handle_prompt_file(&request.files);
        request.files = remaining;
        let mut user_content = prompt_from_file.unwrap_or_else(|| request.prompt.clone());

        if let Some(gate) = base::check_prompt_size(env, &user_content) {
            return Ok(gate);
        }

        let (valid, mut skipped) = Self::validate_combinations(&request.models);

        if valid.is_empty() {
            let payload = json!({
                "status": "consensus_failed",
                "error": "No valid model configurations after validation",
                "models_skipped": skipped,
                "next_steps": "Provide valid model configurations with proper model names and stances.",
            });
            return Ok(ToolOutput::json("consensus_failed", &payload));
        }

        // One provider lookup per distinct model for the whole fan-out.
        let mut resolutions: HashMap<String, ModelResolution> = HashMap::new();
        let mut runnable = Vec::new();

        for entry in valid {
            let stance = entry.stance.clone().unwrap_or_else(|| "neutral".to_string());

            if !resolutions.contains_key(&entry.model) {
                match env.registry.resolve(&entry.model) {
                    Ok(resolution) => {
                        resolutions.insert(entry.model.clone(), resolution);
                    }
                    Err(e) => {
                        skipped.push(format!(
                            "{} (provider not available: {e})",
                            Self::entry_label(&entry.model, &stance)
                        ));
                        continue;
                    }
                }
            }

            runnable.push(entry);
        }

        if runnable.is_empty() {
            let payload = json!({
                "status": "consensus_failed",
                "error": "No model providers available",
                "models_skipped": skipped,
                "next_steps": "Check that the specified models have configured API keys and are available.",
            });
            return Ok(ToolOutput::json("consensus_failed", &payload));
        }

        // Shared prompt: history (when continuing), focus areas, files.
        let first_capability = resolutions[&runnable[0].model].capability.clone();
        let budget = TokenBudget::for_model(&first_capability);

        let thread_id = match &request.common.continuation_id {
            Some(raw_id) => {
                let id = Uuid::parse_str(raw_id)
                    .map_err(|_| ToolError::Validation(format!("Invalid continuation_id: '{raw_id}'")))?;

                if let Some(thread) = env.store.get_thread(id) {
                    let history = build_history(&env.store, &thread, &first_capability);
                    if !history.text.is_empty() {
                        user_content = format!("{}\n\n{user_content}", history.text);
                    }
                    Some(id)
                } else {
                    log::warn!("Consensus continuation {id} expired or unknown, proceeding without history");
                    None
                }
            }
            None => None,
        };

        if !request.focus_areas.is_empty() {
            let areas = request
                .focus_areas
                .iter()
                .map(|area| format!("- {area}"))
                .collect::<Vec<_>>()
                .join("\n");
            user_content.push_str(&format!("\n\nSpecific focus areas for this analysis:\n{areas}"));
        }

        let prepared = prepare_file_content(&env.store, thread_id, &request.files, budget.files, "CONTEXT FILES")?;
        if !prepared.content.is_empty() {
            user_content.push_str(&format!("\n\n{}", prepared.content));
        }

        let thinking_mode = request
            .common
            .thinking_mode
            .as_deref()
            .and_then(ThinkingMode::parse)
            .or(Some(ThinkingMode::Medium));

        // Sequential by intent; responses preserve caller order.
        let mut responses = Vec::new();

        for (index, entry) in runnable.iter().enumerate() {
            let stance = entry.stance.clone().unwrap_or_else(|| "neutral".to_string());
            let resolution = &resolutions[&entry.model];
            let capability = &resolution.capability;

            log::debug!(
                "Consulting {} ({}/{} in sequence)",
                Self::entry_label(&entry.model, &stance),
                index + 1,
                runnable.len()
            );

            let system_prompt = format!(
                "{}{}",
                Self::stance_enhanced_prompt(&stance, entry.stance_prompt.as_deref())?,
                base::locale_instruction(env),
            );

            let (temperature, _) = base::validate_temperature(request.common.temperature, 0.2, capability);

            let generation = GenerationRequest {
                prompt: user_content.clone(),
                model: capability.name.clone(),
                system_prompt: Some(system_prompt),
                temperature,
                max_output_tokens: None,
                thinking_mode: capability.supports_thinking.then_some(thinking_mode).flatten(),
                images: request.common.images.clone(),
                json_schema: None,
            };

            match resolution.provider.generate(generation).await {
                Ok(response) => {
                    responses.push(json!({
                        "model": entry.model,
                        "stance": stance,
                        "status": "success",
                        "verdict": response.content,
                        "metadata": {
                            "provider": response.provider.as_str(),
                            "model_name": response.model_name,
                            "custom_stance_prompt": entry.stance_prompt.is_some(),
                        },
                    }));
                }
                Err(e) => {
                    log::error!("Consensus member {} failed: {e}", Self::entry_label(&entry.model, &stance));
                    responses.push(json!({
                        "model": entry.model,
                        "stance": stance,
                        "status": "error",
                        "error": e.client_message(),
                    }));
                }
            }
        }

        let label = |r: &Value| {
            Self::entry_label(
                r["model"].as_str().unwrap_or_default(),
                r["stance"].as_str().unwrap_or("neutral"),
            )
        };

        let successes: Vec<&Value> = responses.iter().filter(|r| r["status"] == "success").collect();
        let failures: Vec<&Value> = responses.iter().filter(|r| r["status"] == "error").collect();

        if successes.is_empty() {
            let payload = json!({
                "status": "consensus_failed",
                "error": "All model calls failed - no successful responses received",
                "models_skipped": skipped,
                "models_errored": failures.iter().map(|r| label(r)).collect::<Vec<_>>(),
                "next_steps": "Retry with different models or check the error messages for guidance.",
            });
            return Ok(ToolOutput::json("consensus_failed", &payload));
        }

        let payload = json!({
            "status": "consensus_success",
            "models_used": successes.iter().map(|r| label(r)).collect::<Vec<_>>(),
            "models_skipped": skipped,
            "models_errored": failures.iter().map(|r| label(r)).collect::<Vec<_>>(),
            "responses": responses,
            "next_steps": Self::synthesis_guidance(successes.len(), failures.len()),
        });

        let mut output = ToolOutput::json("consensus_success", &payload);

        if let Some(id) = thread_id {
            let mut metadata = Map::new();
            metadata.insert("tool_type".to_string(), "consensus".into());
            metadata.insert("individual_responses".to_string(), responses.clone().into());

            env.store.add_turn(
                id,
                conversation::Role::Assistant,
                TurnData {
                    content: output.content.clone(),
                    files: request.files.clone(),
                    images: request.common.images.clone(),
                    tool_name: Some("consensus".to_string()),
                    model_name: Some("consensus".to_string()),
                    model_metadata: metadata,
                    ..Default::default()
                },
            );

            output = output.with_continuation(id.to_string());
        }

        Ok(output)
    }
}
