//! General development chat and collaborative thinking.

use llm::ToolCategory;

use crate::prompts;
use crate::simple::{SimpleRequest, SimpleTool};

pub struct ChatTool;

impl SimpleTool for ChatTool {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn description(&self) -> &'static str {
        "GENERAL CHAT & COLLABORATIVE THINKING - Use the AI model as your thinking partner! \
         Perfect for: bouncing ideas during your own analysis, getting second opinions on plans, \
         collaborative brainstorming, validating checklists and approaches, exploring \
         alternatives. Also great for explanations, comparisons, and general development \
         questions."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::CHAT_PROMPT
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FastResponse
    }

    fn default_temperature(&self) -> f32 {
        0.5
    }

    fn websearch_guidance(&self) -> Option<&'static str> {
        Some(
            "When discussing topics, consider whether searches for documentation of the \
             technologies mentioned, current best practices, or recent community solutions would \
             strengthen the answer.",
        )
    }

    fn format_response(&self, response: &str, _request: &SimpleRequest) -> String {
        format!(
            "{response}\n\n---\n\n**Agent's Turn:** Evaluate this perspective alongside your own \
             analysis to form a comprehensive solution and continue with the user's request and \
             task at hand."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_appends_the_agents_turn_footer() {
        let request: SimpleRequest = serde_json::from_value(serde_json::json!({"prompt": "x"})).unwrap();
        let formatted = ChatTool.format_response("model says things", &request);

        assert!(formatted.starts_with("model says things"));
        assert!(formatted.contains("**Agent's Turn:**"));
    }

    #[test]
    fn chat_is_a_fast_response_tool() {
        assert_eq!(ChatTool.category(), ToolCategory::FastResponse);
        assert_eq!(ChatTool.default_temperature(), 0.5);
    }
}
