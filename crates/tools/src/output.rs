//! The response envelope every tool returns to the MCP shell.

use serde::Serialize;

/// How the host should render `content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Markdown,
    Json,
}

/// Standardized output format for all tools.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    /// Outcome marker: `success`, `error`, `continuation_available`, or a
    /// tool-specific workflow status.
    pub status: String,
    /// The main content of the response.
    pub content: String,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_id: Option<String>,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            content: content.into(),
            content_type: ContentType::Markdown,
            metadata: serde_json::Map::new(),
            continuation_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            content: message.into(),
            content_type: ContentType::Text,
            metadata: serde_json::Map::new(),
            continuation_id: None,
        }
    }

    /// A JSON payload response; `status` mirrors the payload's own status
    /// field where one exists.
    pub fn json(status: impl Into<String>, payload: &serde_json::Value) -> Self {
        let content = serde_json::to_string_pretty(payload)
            .unwrap_or_else(|_| r#"{"status":"error","content":"serialization failed"}"#.to_string());

        Self {
            status: status.into(),
            content,
            content_type: ContentType::Json,
            metadata: serde_json::Map::new(),
            continuation_id: None,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn with_continuation(mut self, id: impl Into<String>) -> Self {
        self.continuation_id = Some(id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;

    use super::*;

    #[test]
    fn success_defaults_to_markdown() {
        let output = ToolOutput::success("all good");

        assert_eq!(output.status, "success");
        assert_eq!(output.content_type, ContentType::Markdown);
        assert!(!output.is_error());
    }

    #[test]
    fn error_is_plain_text() {
        let output = ToolOutput::error("it broke");

        assert!(output.is_error());
        assert_eq!(output.content_type, ContentType::Text);
    }

    #[test]
    fn empty_metadata_is_omitted_from_the_wire() {
        let output = ToolOutput::success("x");

        assert_json_snapshot!(output, @r#"
        {
          "status": "success",
          "content": "x",
          "content_type": "markdown"
        }
        "#);
    }

    #[test]
    fn metadata_and_continuation_serialize() {
        let output = ToolOutput::success("x")
            .with_metadata("model_name", "gemini-2.5-flash")
            .with_continuation("b8f0d2c0-0000-4000-8000-000000000000");

        assert_json_snapshot!(output, @r#"
        {
          "status": "success",
          "content": "x",
          "content_type": "markdown",
          "metadata": {
            "model_name": "gemini-2.5-flash"
          },
          "continuation_id": "b8f0d2c0-0000-4000-8000-000000000000"
        }
        "#);
    }
}
