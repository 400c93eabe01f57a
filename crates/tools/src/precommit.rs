//! Pre-commit changeset validation workflow.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::WorkflowTool;

pub struct PrecommitTool;

impl WorkflowTool for PrecommitTool {
    fn name(&self) -> &'static str {
        "precommit"
    }

    fn description(&self) -> &'static str {
        "PRE-COMMIT VALIDATION - Validate git changes before committing. Walk through the \
         changeset step by step: confirm the diff matches the stated intent, hunt for \
         regressions, incomplete changes, missing tests, and leftover debug code. An expert \
         model double-checks the verdict unless you reach certain confidence. Use before every \
         non-trivial commit, especially multi-repository changes."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::PRECOMMIT_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "path".to_string(),
            json!({
                "type": "string",
                "description": "Absolute path to the repository root containing the changes",
            }),
        );
        fields.insert(
            "compare_to".to_string(),
            json!({
                "type": "string",
                "description": "Optional git ref to compare against instead of the working tree",
            }),
        );
        fields.insert(
            "include_staged".to_string(),
            json!({
                "type": "boolean",
                "default": true,
                "description": "Include staged changes in the validation",
            }),
        );
        fields.insert(
            "include_unstaged".to_string(),
            json!({
                "type": "boolean",
                "default": true,
                "description": "Include unstaged changes in the validation",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Enumerate the changed files and read the full diff",
                "Identify what the change claims to do (commit message, task context)",
                "Map which parts of the codebase the changes touch",
            ]
        } else if matches!(confidence, "exploring" | "low") {
            &[
                "Check each changed file for unintended modifications",
                "Verify new code paths have tests and existing tests still apply",
                "Look for leftover debug statements, commented-out code, and secrets",
                "Confirm no referenced file, migration, or config was forgotten",
            ]
        } else {
            &[
                "Re-verify the highest-risk hunks against the stated intent",
                "Confirm the change is complete and self-contained for this commit",
                "Assemble the ship/hold verdict with the minimal required fixes",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn skip_expert_on_certain_confidence(&self) -> bool {
        true
    }

    fn completion_status(&self) -> &'static str {
        "precommit_validation_complete"
    }

    fn certain_skip_status(&self) -> &'static str {
        "skipped_due_to_certain_validation_confidence"
    }

    fn completion_message(&self) -> String {
        "Pre-commit validation complete with CERTAIN confidence. Present the validation verdict \
         and proceed: commit if clean, or apply the minimal required fixes first."
            .to_string()
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_precommit", "pause_for_validation");
        rename_key(response, "precommit_status", "validation_status");
        rename_key(response, "complete_precommit", "complete_validation");
    }
}
