//! Refactoring opportunity analysis workflow.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::WorkflowTool;

pub struct RefactorTool;

impl WorkflowTool for RefactorTool {
    fn name(&self) -> &'static str {
        "refactor"
    }

    fn description(&self) -> &'static str {
        "INTELLIGENT REFACTORING - Find and prioritize refactoring opportunities. Walk through \
         the code step by step looking for code smells, decomposition candidates, modernization \
         wins, and organization problems, then validate the plan with an expert model. \
         Confidence uses a completion scale: exploring → incomplete → partial → complete; \
         'complete' means every opportunity in scope is recorded."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::REFACTOR_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "refactor_type".to_string(),
            json!({
                "type": "string",
                "enum": ["codesmells", "decompose", "modernize", "organization"],
                "default": "codesmells",
                "description": "Focus area for the refactoring analysis",
            }),
        );
        fields.insert(
            "style_guide_examples".to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "Absolute paths to exemplary files whose style the refactoring \
                                should match",
            }),
        );
        // The completion scale replaces the generic confidence ladder.
        fields.insert(
            "confidence".to_string(),
            json!({
                "type": "string",
                "enum": ["exploring", "incomplete", "partial", "complete"],
                "default": "incomplete",
                "description": "How completely the refactoring opportunities in scope have been \
                                recorded. Only use 'complete' when no further analysis is needed.",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Read the files in scope and understand their responsibilities",
                "Identify the code smells with the highest maintenance cost",
                "Note oversized functions, classes, and modules that resist change",
            ]
        } else if matches!(confidence, "exploring" | "incomplete") {
            &[
                "Examine each candidate more deeply and record exact locations",
                "Check which suggestions are behavior-preserving and which are not",
                "Look for modernization opportunities the language now offers",
            ]
        } else {
            &[
                "Prioritize the recorded opportunities by impact and effort",
                "Verify suggestions against the project's existing conventions",
                "Prepare the ordered refactoring plan with concrete shapes",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn skip_expert_on_certain_confidence(&self) -> bool {
        true
    }

    fn certain_confidence_value(&self) -> &'static str {
        "complete"
    }

    fn completion_status(&self) -> &'static str {
        "refactoring_analysis_complete_ready_for_implementation"
    }

    fn certain_skip_status(&self) -> &'static str {
        "skipped_due_to_complete_refactoring_confidence"
    }

    fn completion_message(&self) -> String {
        "Refactoring analysis complete. Present the opportunities ordered by priority and begin \
         implementing the highest-impact, lowest-risk items first."
            .to_string()
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_refactor", "pause_for_refactoring_analysis");
        rename_key(response, "refactor_status", "refactoring_status");
        rename_key(response, "complete_refactor", "complete_refactoring");
    }
}
