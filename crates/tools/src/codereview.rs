//! Step-by-step code review workflow.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::WorkflowTool;

pub struct CodeReviewTool;

impl WorkflowTool for CodeReviewTool {
    fn name(&self) -> &'static str {
        "codereview"
    }

    fn description(&self) -> &'static str {
        "COMPREHENSIVE CODE REVIEW - Systematic review with expert validation. Walk through the \
         code step by step, examining quality, security, performance, and architecture, recording \
         issues by severity as you go. The tool enforces real investigation between steps and \
         consults an expert model once the review completes. Perfect for: full code reviews, \
         security-focused reviews, pre-merge quality gates."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::CODEREVIEW_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "review_type".to_string(),
            json!({
                "type": "string",
                "enum": ["full", "security", "performance", "quick"],
                "default": "full",
                "description": "Type of review to perform",
            }),
        );
        fields.insert(
            "severity_filter".to_string(),
            json!({
                "type": "string",
                "enum": ["critical", "high", "medium", "low", "all"],
                "default": "all",
                "description": "Minimum severity level to report",
            }),
        );
        fields.insert(
            "standards".to_string(),
            json!({
                "type": "string",
                "description": "Coding standards or style guides to enforce during the review",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Read and understand the code files being reviewed",
                "Map the overall structure, entry points, and dependencies of the code",
                "Identify the main business logic and the contracts it must uphold",
                "Note any immediate red flags: oversized functions, duplicated logic, unclear naming",
            ]
        } else if matches!(confidence, "exploring" | "low") {
            &[
                "Examine each identified file for code smells and anti-patterns",
                "Check error handling, resource cleanup, and boundary conditions",
                "Look for security issues: input validation, auth checks, injection surfaces",
                "Assess performance-sensitive paths for algorithmic problems",
            ]
        } else {
            &[
                "Verify each recorded issue against the actual code once more",
                "Confirm severity ratings reflect real impact, not style preference",
                "Check for cross-cutting concerns the per-file passes missed",
                "Assemble concrete fix recommendations for every confirmed issue",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn skip_expert_on_certain_confidence(&self) -> bool {
        true
    }

    fn completion_status(&self) -> &'static str {
        "code_review_complete_ready_for_implementation"
    }

    fn certain_skip_status(&self) -> &'static str {
        "skipped_due_to_certain_review_confidence"
    }

    fn skip_expert_reason(&self) -> String {
        "Completed comprehensive code review with full confidence locally".to_string()
    }

    fn completion_message(&self) -> String {
        "Code review complete with CERTAIN confidence. Present the user with the complete review \
         results categorized by severity, and IMMEDIATELY proceed with implementing the highest \
         priority fixes or provide specific guidance for improvements."
            .to_string()
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_codereview", "pause_for_code_review");
        rename_key(response, "codereview_status", "code_review_status");
        rename_key(response, "complete_codereview", "complete_code_review");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_status_uses_the_review_vocabulary() {
        let mut response = serde_json::from_value::<Map<String, Value>>(json!({
            "status": "pause_for_codereview",
            "codereview_status": {"files_checked": 2},
        }))
        .unwrap();

        CodeReviewTool.customize_response(&mut response);

        assert_eq!(response["status"], "pause_for_code_review");
        assert!(response.contains_key("code_review_status"));
    }

    #[test]
    fn review_schema_offers_review_type() {
        let fields = CodeReviewTool.tool_fields();
        assert_eq!(fields["review_type"]["default"], "full");
        assert_eq!(fields["severity_filter"]["default"], "all");
    }
}
