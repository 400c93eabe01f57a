//! Extended reasoning on top of the agent's own analysis.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::{ConsolidatedFindings, WorkflowTool};

pub struct ThinkDeepTool;

impl WorkflowTool for ThinkDeepTool {
    fn name(&self) -> &'static str {
        "thinkdeep"
    }

    fn description(&self) -> &'static str {
        "EXTENDED THINKING & REASONING - A second brain for deep analysis. Share your current \
         thinking and let a deeper investigation extend it: challenge assumptions, find edge \
         cases, explore alternatives, and validate conclusions with an expert model. Perfect \
         for: architecture decisions, complex trade-offs, design validation, anything where a \
         wrong call is expensive."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::THINKDEEP_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "problem_context".to_string(),
            json!({
                "type": "string",
                "description": "Additional context about the problem or the goal of the analysis",
            }),
        );
        fields.insert(
            "focus_areas".to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "Aspects to weight most (e.g. 'scalability', 'operational cost')",
            }),
        );
        fields
    }

    fn required_actions(&self, step_number: usize, confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "State the decision or problem precisely, including what success looks like",
                "Collect the constraints: technical, organizational, and time",
                "List the options already considered and why they are on the table",
            ]
        } else if matches!(confidence, "exploring" | "low") {
            &[
                "Examine the strongest counter-argument to your current position",
                "Identify assumptions that, if wrong, would flip the conclusion",
                "Check edge cases and failure modes for each option",
            ]
        } else {
            &[
                "Stress-test the leading option against the collected constraints",
                "Confirm the evidence supports the conclusion without gaps",
                "Prepare the trade-off summary you would defend in review",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn should_call_expert(&self, findings: &ConsolidatedFindings) -> bool {
        // Thinking work rarely has files; findings alone justify validation.
        !findings.findings.is_empty()
    }

    fn completion_status(&self) -> &'static str {
        "deep_thinking_complete"
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_thinkdeep", "pause_for_deep_thinking");
        rename_key(response, "thinkdeep_status", "thinking_status");
        rename_key(response, "complete_thinkdeep", "complete_thinking");
    }
}
