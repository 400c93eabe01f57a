//! Static code tracing workflow.
//!
//! One tool, two trace modes: `precision` follows execution flow from an
//! entry point, `dependencies` maps structural relationships around a
//! target. `ask` returns a mode-selection response without consuming a
//! workflow step, for agents that don't know which rendering they need yet.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::environment::ToolEnv;
use crate::output::ToolOutput;
use crate::prompts;
use crate::workflow::{WorkflowRequest, WorkflowTool};

pub struct TracerTool;

impl WorkflowTool for TracerTool {
    fn name(&self) -> &'static str {
        "tracer"
    }

    fn description(&self) -> &'static str {
        "STATIC CODE TRACING - Trace code by reading, not running. Two modes: 'precision' \
         follows the execution flow of a method or function (call chains, usage sites, side \
         effects); 'dependencies' maps the structural relationships of a class or module (what \
         calls it, what it calls). Use 'ask' as the mode if you want guidance choosing. The \
         agent performs the static walk step by step; an expert model renders the final trace."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::TRACER_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "trace_mode".to_string(),
            json!({
                "type": "string",
                "enum": ["precision", "dependencies", "ask"],
                "description": "Trace mode: 'precision' (execution path from an entry point), \
                                'dependencies' (bidirectional structural map), or 'ask' for \
                                guidance choosing.",
            }),
        );
        fields.insert(
            "target_description".to_string(),
            json!({
                "type": "string",
                "description": "What to trace and why - the method, function, class, or module \
                                of interest, with context.",
            }),
        );

        fields
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["trace_mode", "target_description"]
    }

    fn required_actions(&self, step_number: usize, _confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Locate the trace target and read its definition in full",
                "Identify the files that reference the target",
                "Decide the trace boundary: where the walk stops being informative",
            ]
        } else {
            &[
                "Follow each unexplored edge from the current frontier, one hop at a time",
                "Record file:line anchors for every confirmed edge",
                "Mark edges that rely on dynamic dispatch as inferred, not confirmed",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn completion_status(&self) -> &'static str {
        "tracing_complete"
    }

    fn preprocess(&self, _env: &ToolEnv, request: &WorkflowRequest) -> Option<ToolOutput> {
        let mode = request.extra.get("trace_mode").and_then(Value::as_str)?;

        if mode != "ask" {
            return None;
        }

        let payload = json!({
            "status": "mode_selection_required",
            "content": "Choose a trace mode before starting:\n\n\
                        - precision: for a METHOD or FUNCTION - follows the execution path, call \
                        chains, and usage sites. Choose when asking 'when is this called and what \
                        happens next?'\n\
                        - dependencies: for a CLASS or MODULE - maps what depends on the target \
                        and what the target depends on. Choose when asking 'what is connected to \
                        this?'\n\n\
                        Re-invoke tracer with trace_mode set to your choice; the step counter has \
                        not advanced.",
            "metadata": { "tool_name": "tracer" },
        });

        Some(ToolOutput::json("mode_selection_required", &payload))
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_tracer", "pause_for_tracing");
        rename_key(response, "tracer_status", "tracing_status");
        rename_key(response, "complete_tracer", "complete_tracing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> ToolEnv {
        let config = config::Config::default();
        let registry = llm::ProviderRegistry::empty(config.providers.clone());
        ToolEnv::new(config, registry)
    }

    fn request(mode: &str) -> WorkflowRequest {
        serde_json::from_value(json!({
            "step": "trace the dispatcher",
            "step_number": 1,
            "total_steps": 3,
            "next_step_required": true,
            "trace_mode": mode,
            "target_description": "dispatch()",
        }))
        .unwrap()
    }

    #[test]
    fn ask_mode_intercepts_without_consuming_a_step() {
        let output = TracerTool.preprocess(&env(), &request("ask")).unwrap();

        assert_eq!(output.status, "mode_selection_required");
        assert!(output.content.contains("precision"));
        assert!(output.content.contains("dependencies"));
    }

    #[test]
    fn concrete_modes_proceed_normally() {
        assert!(TracerTool.preprocess(&env(), &request("precision")).is_none());
        assert!(TracerTool.preprocess(&env(), &request("dependencies")).is_none());
    }
}
