//! Interactive step-by-step planning.
//!
//! Pure data processing: the engine tracks, threads, and structures the
//! plan; no provider is ever called. Supports revising earlier steps and
//! branching alternative approaches.

use serde_json::{Map, Value, json};

use crate::debug::rename_status;
use crate::prompts;
use crate::workflow::{ConsolidatedFindings, WorkflowTool};

pub struct PlannerTool;

impl WorkflowTool for PlannerTool {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn description(&self) -> &'static str {
        "INTERACTIVE SEQUENTIAL PLANNER - Break complex tasks into structured, actionable plans, \
         one step per call. Supports deep reflection between steps, revising earlier steps when \
         understanding improves, and branching to explore alternative approaches. The plan \
         threads across calls, so later planning sessions can build on earlier ones via \
         continuation_id. No external model is consulted; the value is the forced structure."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::PLANNER_PROMPT
    }

    fn requires_model(&self) -> bool {
        false
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "is_step_revision".to_string(),
            json!({
                "type": "boolean",
                "default": false,
                "description": "True when this step revises a previous step",
            }),
        );
        fields.insert(
            "revises_step_number".to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "The step number being revised, when is_step_revision is true",
            }),
        );
        fields.insert(
            "is_branch_point".to_string(),
            json!({
                "type": "boolean",
                "default": false,
                "description": "True when this step starts an alternative approach",
            }),
        );
        fields.insert(
            "branch_from_step".to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "description": "The step this branch diverges from",
            }),
        );
        fields.insert(
            "branch_id".to_string(),
            json!({
                "type": "string",
                "description": "Identifier for this branch (e.g. 'approach-b')",
            }),
        );
        fields.insert(
            "more_steps_needed".to_string(),
            json!({
                "type": "boolean",
                "default": false,
                "description": "True when the plan needs more steps beyond the current estimate",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, _confidence: &str, total_steps: usize) -> Vec<String> {
        if step_number == 1 {
            vec![
                "Clarify the goal and what a finished plan must cover".to_string(),
                "List the known constraints and unknowns worth resolving early".to_string(),
            ]
        } else if step_number < total_steps {
            vec![
                "Reflect on the plan so far before adding the next step".to_string(),
                "Check dependencies: does any earlier step need revision first?".to_string(),
            ]
        } else {
            vec!["Review the complete plan for ordering and missing steps".to_string()]
        }
    }

    fn should_call_expert(&self, _findings: &ConsolidatedFindings) -> bool {
        false
    }

    fn completion_status(&self) -> &'static str {
        "planning_success"
    }

    fn skip_expert_reason(&self) -> String {
        "Planner is self-contained; no external model is consulted".to_string()
    }

    fn completion_message(&self) -> String {
        "Planning complete. Present the full plan to the user in a well-structured format with \
         clear sections, numbered steps, and visual organization. If implementation is next, \
         begin with step 1 and use the continuation_id to extend this plan later."
            .to_string()
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_planner", "pause_for_planning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_is_model_free() {
        assert!(!PlannerTool.requires_model());
        assert!(!PlannerTool.should_call_expert(&ConsolidatedFindings::default()));
        assert_eq!(PlannerTool.completion_status(), "planning_success");
    }

    #[test]
    fn planning_vocabulary_applies() {
        let mut response = serde_json::from_value::<Map<String, Value>>(json!({
            "status": "pause_for_planner",
        }))
        .unwrap();

        PlannerTool.customize_response(&mut response);
        assert_eq!(response["status"], "pause_for_planning");
    }
}
