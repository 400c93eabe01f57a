//! Holistic codebase analysis workflow.
//!
//! Unlike the review tools, analyze always consults the expert model: the
//! value of a strategic audit is the second opinion, so there is no
//! certainty short-circuit.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::{ConsolidatedFindings, WorkflowTool};

pub struct AnalyzeTool;

impl WorkflowTool for AnalyzeTool {
    fn name(&self) -> &'static str {
        "analyze"
    }

    fn description(&self) -> &'static str {
        "SMART FILE ANALYSIS - Holistic technical audit of code or whole codebases. Walk through \
         the material step by step assessing architecture, scalability, maintainability, and \
         strategic improvement opportunities; an expert model always validates the final \
         assessment. Perfect for: architecture reviews, onboarding into unfamiliar code, \
         system-level risk analysis."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::ANALYZE_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "analysis_type".to_string(),
            json!({
                "type": "string",
                "enum": ["architecture", "performance", "security", "quality", "general"],
                "default": "general",
                "description": "Type of analysis to perform",
            }),
        );
        fields.insert(
            "output_format".to_string(),
            json!({
                "type": "string",
                "enum": ["summary", "detailed", "actionable"],
                "default": "detailed",
                "description": "How to structure the analysis output",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, _confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Read the files in scope and map the module structure",
                "Identify the system's purpose, boundaries, and main data flows",
                "Note the architectural patterns in use and where they are violated",
            ]
        } else {
            &[
                "Examine the areas flagged as strategically significant",
                "Assess scalability limits and change-resistance hot spots",
                "Gather concrete evidence for each emerging insight",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    /// The expert pass is the point of this tool.
    fn should_call_expert(&self, _findings: &ConsolidatedFindings) -> bool {
        true
    }

    fn completion_status(&self) -> &'static str {
        "analysis_complete_ready_for_implementation"
    }

    fn skip_expert_status(&self) -> &'static str {
        "skipped_due_to_complete_analysis"
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_analyze", "pause_for_analysis");
        rename_key(response, "analyze_status", "analysis_status");
        rename_key(response, "complete_analyze", "complete_analysis");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_always_wants_the_expert() {
        let findings = ConsolidatedFindings::default();
        assert!(AnalyzeTool.should_call_expert(&findings));
        assert!(!AnalyzeTool.skip_expert_on_certain_confidence());
    }

    #[test]
    fn analysis_vocabulary_applies() {
        let mut response = serde_json::from_value::<Map<String, Value>>(json!({
            "status": "pause_for_analyze",
            "analyze_status": {},
        }))
        .unwrap();

        AnalyzeTool.customize_response(&mut response);

        assert_eq!(response["status"], "pause_for_analysis");
        assert!(response.contains_key("analysis_status"));
    }
}
