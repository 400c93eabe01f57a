//! Table-driven input schema assembly.
//!
//! Every tool's schema is a merge of three field tables: the common fields
//! all tools accept, the workflow fields multi-step tools add, and the
//! tool's own map. Emission is data, not types; tools contribute plain JSON
//! field definitions.

use serde_json::{Map, Value, json};

use crate::environment::ToolEnv;

/// Common fields every model-backed tool accepts.
pub(crate) fn common_fields() -> Map<String, Value> {
    let fields = json!({
        "temperature": {
            "type": "number",
            "description": "Temperature for response (0.0 to 1.0). Lower values are more focused and \
                            deterministic, higher values are more creative. Tool-specific defaults apply \
                            if not specified.",
            "minimum": 0.0,
            "maximum": 1.0,
        },
        "thinking_mode": {
            "type": "string",
            "enum": ["minimal", "low", "medium", "high", "max"],
            "description": "Thinking depth: minimal (0.5% of model max), low (8%), medium (33%), \
                            high (67%), max (100% of model max). Higher modes enable deeper reasoning \
                            at the cost of speed.",
        },
        "use_websearch": {
            "type": "boolean",
            "description": "Enable web search for documentation, best practices, and current information. \
                            When enabled, the model can request that searches be performed and results \
                            shared back during the conversation.",
            "default": true,
        },
        "continuation_id": {
            "type": "string",
            "description": "Thread continuation ID for multi-turn conversations. When provided, the \
                            complete conversation history is automatically embedded as context. Can be \
                            used across different tools.",
        },
        "images": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Optional image(s) for visual context. Accepts absolute file paths or \
                            base64 data URLs. Useful for UI discussions, diagrams, error screens and \
                            visual analysis tasks.",
        },
    });

    as_map(fields)
}

/// The `files` field simple tools accept (workflow tools use
/// `relevant_files` instead).
pub(crate) fn files_field() -> Value {
    json!({
        "type": "array",
        "items": {"type": "string"},
        "description": "Optional files for context (must be FULL absolute paths to real files / \
                        folders - DO NOT SHORTEN)",
    })
}

/// Fields shared by every workflow (multi-step) tool.
pub(crate) fn workflow_fields() -> Map<String, Value> {
    let fields = json!({
        "step": {
            "type": "string",
            "description": "Current work step content and findings from your overall work",
        },
        "step_number": {
            "type": "integer",
            "minimum": 1,
            "description": "Current step number in the work sequence (starts at 1)",
        },
        "total_steps": {
            "type": "integer",
            "minimum": 1,
            "description": "Estimated total steps needed to complete the work",
        },
        "next_step_required": {
            "type": "boolean",
            "description": "Whether another work step is needed after this one",
        },
        "findings": {
            "type": "string",
            "description": "Important findings, evidence and insights discovered in this step of the work",
        },
        "files_checked": {
            "type": "array",
            "items": {"type": "string"},
            "description": "List of files examined during this work step",
        },
        "relevant_files": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Files identified as relevant to the issue/goal",
        },
        "relevant_context": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Methods/functions identified as involved in the issue",
        },
        "issues_found": {
            "type": "array",
            "items": {"type": "object"},
            "description": "Issues identified with severity levels during work",
        },
        "confidence": {
            "type": "string",
            "enum": ["exploring", "low", "medium", "high", "certain"],
            "description": "Confidence level in findings. Do NOT use 'certain' unless the work is \
                            fully complete and validated; 'certain' skips external validation.",
        },
        "hypothesis": {
            "type": "string",
            "description": "Current theory about the issue/goal based on work",
        },
        "backtrack_from_step": {
            "type": "integer",
            "minimum": 1,
            "description": "Step number to backtrack from if work needs revision",
        },
        "use_assistant_model": {
            "type": "boolean",
            "default": true,
            "description": "Whether to use the assistant model for expert analysis after completing \
                            the workflow steps. Set to false to skip expert analysis.",
        },
    });

    as_map(fields)
}

/// Schema for the `model` field, naming what the registry can currently
/// serve. In auto mode the field is required and the description pushes the
/// caller to choose deliberately.
pub(crate) fn model_field(env: &ToolEnv) -> Value {
    let summary = env.registry.available_model_summary();

    let description = if env.config.is_auto_mode() {
        format!(
            "Model to use. Native models: {summary}. Use the most suitable model for the task: \
             deep reasoning models for complex debugging and review, fast models for quick checks."
        )
    } else {
        format!(
            "Model to use, or omit for the configured default ('{}'). Available: {summary}.",
            env.config.default_model
        )
    };

    json!({
        "type": "string",
        "description": description,
    })
}

/// Assemble a simple tool's schema.
pub(crate) fn build_simple_schema(
    env: &ToolEnv,
    tool_fields: Map<String, Value>,
    required: &[&str],
    requires_model: bool,
) -> Value {
    let mut properties = common_fields();
    properties.insert("files".to_string(), files_field());

    if requires_model {
        properties.insert("model".to_string(), model_field(env));
    }

    for (name, field) in tool_fields {
        properties.insert(name, field);
    }

    finish_schema(env, properties, required, requires_model)
}

/// Assemble a workflow tool's schema: workflow fields + common fields +
/// tool extras.
pub(crate) fn build_workflow_schema(
    env: &ToolEnv,
    tool_fields: Map<String, Value>,
    extra_required: &[&str],
    requires_model: bool,
) -> Value {
    let mut properties = workflow_fields();

    for (name, field) in common_fields() {
        properties.entry(name).or_insert(field);
    }

    if requires_model {
        properties.insert("model".to_string(), model_field(env));
    }

    for (name, field) in tool_fields {
        properties.insert(name, field);
    }

    let mut required = vec!["step", "step_number", "total_steps", "next_step_required", "findings"];
    required.extend_from_slice(extra_required);

    finish_schema(env, properties, &required, requires_model)
}

fn finish_schema(env: &ToolEnv, properties: Map<String, Value>, required: &[&str], requires_model: bool) -> Value {
    let mut required: Vec<&str> = required.to_vec();

    if requires_model && env.config.is_auto_mode() && !required.contains(&"model") {
        required.push("model");
    }

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
