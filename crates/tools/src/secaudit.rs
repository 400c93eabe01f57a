//! Security audit workflow.

use serde_json::{Map, Value, json};

use crate::debug::{rename_key, rename_status};
use crate::prompts;
use crate::workflow::{WorkflowRequest, WorkflowTool};

pub struct SecauditTool;

impl WorkflowTool for SecauditTool {
    fn name(&self) -> &'static str {
        "secaudit"
    }

    fn description(&self) -> &'static str {
        "SECURITY AUDIT - Systematic security assessment with expert validation. Walk through \
         the attack surface step by step: injection points, authentication and authorization, \
         data protection, dependency exposure, OWASP Top 10 alignment. Vulnerabilities are \
         recorded with severity as you go; an expert model validates the audit unless you reach \
         certain confidence."
    }

    fn system_prompt(&self) -> &'static str {
        prompts::SECAUDIT_PROMPT
    }

    fn tool_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            "audit_focus".to_string(),
            json!({
                "type": "string",
                "enum": ["owasp", "compliance", "infrastructure", "dependencies", "comprehensive"],
                "default": "comprehensive",
                "description": "Primary focus area for the audit",
            }),
        );
        fields.insert(
            "threat_level".to_string(),
            json!({
                "type": "string",
                "enum": ["low", "medium", "high", "critical"],
                "default": "medium",
                "description": "Assessed threat level of the application's context (e.g. \
                                internet-facing payment handling is 'critical')",
            }),
        );
        fields.insert(
            "compliance_requirements".to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "Compliance regimes in scope (e.g. 'PCI DSS', 'SOC 2', 'GDPR')",
            }),
        );

        fields
    }

    fn required_actions(&self, step_number: usize, confidence: &str, _total_steps: usize) -> Vec<String> {
        let actions: &[&str] = if step_number == 1 {
            &[
                "Map the attack surface: entry points, trust boundaries, data flows",
                "Identify the technology stack and its known weak spots",
                "Locate authentication, authorization, and session handling code",
            ]
        } else if matches!(confidence, "exploring" | "low") {
            &[
                "Trace user input from every entry point to its sinks",
                "Check how secrets and sensitive data are stored, logged, and transmitted",
                "Examine authorization checks on each privileged operation",
                "Review dependency versions against known vulnerabilities",
            ]
        } else {
            &[
                "Verify each recorded vulnerability with a concrete attack scenario",
                "Confirm severity ratings reflect exploitability and impact",
                "Assemble remediation guidance ordered by risk",
            ]
        };

        actions.iter().map(|a| a.to_string()).collect()
    }

    fn skip_expert_on_certain_confidence(&self) -> bool {
        true
    }

    fn completion_status(&self) -> &'static str {
        "security_analysis_complete"
    }

    fn certain_skip_status(&self) -> &'static str {
        "skipped_due_to_certain_audit_confidence"
    }

    fn skip_expert_reason(&self) -> String {
        "Completed comprehensive security audit with full confidence locally".to_string()
    }

    fn completion_message(&self) -> String {
        "Security audit complete with CERTAIN confidence. Present the audit results categorized \
         by severity and IMMEDIATELY proceed with the highest priority security fixes or provide \
         specific remediation guidance."
            .to_string()
    }

    fn expert_context_sections(&self, request: &WorkflowRequest) -> Vec<(String, String)> {
        let mut sections = Vec::new();

        if let Some(focus) = request.extra.get("audit_focus").and_then(Value::as_str) {
            sections.push(("audit focus".to_string(), focus.to_string()));
        }

        if let Some(threat) = request.extra.get("threat_level").and_then(Value::as_str) {
            sections.push(("threat level".to_string(), threat.to_string()));
        }

        sections
    }

    fn customize_response(&self, response: &mut Map<String, Value>) {
        rename_status(response, "pause_for_secaudit", "pause_for_security_audit");
        rename_key(response, "secaudit_status", "security_audit_status");
        rename_key(response, "complete_secaudit", "complete_security_audit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_vocabulary_applies() {
        let mut response = serde_json::from_value::<Map<String, Value>>(json!({
            "status": "pause_for_secaudit",
            "secaudit_status": {},
        }))
        .unwrap();

        SecauditTool.customize_response(&mut response);

        assert_eq!(response["status"], "pause_for_security_audit");
        assert!(response.contains_key("security_audit_status"));
    }

    #[test]
    fn focus_and_threat_feed_the_expert_context() {
        let request: WorkflowRequest = serde_json::from_value(json!({
            "step": "s",
            "step_number": 1,
            "total_steps": 1,
            "next_step_required": false,
            "audit_focus": "owasp",
            "threat_level": "high",
        }))
        .unwrap();

        let sections = SecauditTool.expert_context_sections(&request);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].1, "owasp");
    }
}
