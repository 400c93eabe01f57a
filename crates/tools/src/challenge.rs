//! Critical-reassessment wrapper: prevents reflexive agreement.
//!
//! Pure data transform; no provider call and no model field. The caller's
//! statement is returned wrapped in instructions that force genuine critical
//! evaluation instead of compliance.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::base::{Tool, ToolAnnotations, ToolError, validate_absolute_paths};
use crate::environment::ToolEnv;
use crate::output::ToolOutput;
use crate::prompts;

#[derive(Debug, Deserialize)]
struct ChallengeRequest {
    prompt: String,
}

pub struct ChallengeTool;

#[async_trait]
impl Tool for ChallengeTool {
    fn name(&self) -> &'static str {
        "challenge"
    }

    fn description(&self) -> &'static str {
        "This tool helps prevent reflexive agreement when users challenge your responses. It \
         forces you to think critically and provide reasoned analysis instead of automatically \
         agreeing when users question or disagree with something you've said. Invoke it when the \
         user requests it with the word 'challenge', or automatically when an existing \
         conversation context shows the user disagreeing with, questioning, or challenging your \
         prior statements ('But ...', 'Why did you...', 'Are you sure...', 'That seems \
         wrong...'). Do NOT auto-trigger for new feature requests or initial questions. Truth and \
         correctness matter more than agreement: if the user is wrong, explain why; if you were \
         wrong, acknowledge it and correct course."
    }

    fn requires_model(&self) -> bool {
        false
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations { read_only: true }
    }

    fn input_schema(&self, _env: &ToolEnv) -> Value {
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The user's message or statement to analyze critically. When \
                                    manually invoked with 'challenge', exclude that prefix - just \
                                    pass the actual content.",
                },
            },
            "required": ["prompt"],
            "additionalProperties": false,
        })
    }

    async fn execute(&self, _env: &ToolEnv, arguments: Value) -> ToolOutput {
        match self.run(arguments) {
            Ok(output) => output,
            Err(error) => error.into(),
        }
    }
}

impl ChallengeTool {
    fn run(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        validate_absolute_paths(&arguments)?;

        let request: ChallengeRequest = serde_json::from_value(arguments)
            .map_err(|e| ToolError::Validation(format!("Invalid request for 'challenge': {e}")))?;

        let wrapped = prompts::CHALLENGE_PROMPT_TEMPLATE.replace("{statement}", &request.prompt);

        let payload = json!({
            "status": "challenge_created",
            "original_statement": request.prompt,
            "challenge_prompt": wrapped,
            "instructions": "Present the challenge_prompt to yourself and respond with a genuine, \
                             critically reasoned assessment before continuing the conversation.",
        });

        Ok(ToolOutput::json("challenge_created", &payload))
    }
}
