use std::borrow::Cow;
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo, Tool as McpTool, ToolAnnotations,
    },
    service::{RequestContext, RoleServer},
};
use serde_json::Value;
use tools::{Tool, ToolEnv, ToolOutput, ToolRegistry};

/// The rmcp handler: one instance serves the whole tool registry.
#[derive(Clone)]
pub struct ConclaveServer {
    env: ToolEnv,
    registry: Arc<ToolRegistry>,
}

impl ConclaveServer {
    pub fn new(env: ToolEnv, registry: Arc<ToolRegistry>) -> Self {
        Self { env, registry }
    }

    pub fn tool_count(&self) -> usize {
        self.registry.tools().count()
    }

    fn describe(&self, tool: &dyn Tool) -> McpTool {
        let schema = match tool.input_schema(&self.env) {
            Value::Object(map) => map,
            other => {
                // Schemas are assembled as objects; anything else is an
                // authoring bug worth surfacing loudly in logs.
                log::error!("Tool '{}' produced a non-object schema: {other}", tool.name());
                serde_json::Map::new()
            }
        };

        let mut described = McpTool::new(
            Cow::Borrowed(tool.name()),
            Cow::Borrowed(tool.description()),
            Arc::new(schema),
        );

        if tool.annotations().read_only {
            described.annotations = Some(ToolAnnotations {
                read_only_hint: Some(true),
                ..ToolAnnotations::default()
            });
        }

        described
    }
}

/// Render a tool output as an MCP result.
///
/// The full envelope (status, content, metadata, continuation_id) travels as
/// one JSON text content; hosts surface `continuation_id` to offer
/// follow-ups.
fn to_call_result(output: ToolOutput) -> CallToolResult {
    let is_error = output.is_error();

    let payload = serde_json::to_string(&output).unwrap_or_else(|e| {
        log::error!("Failed to serialize tool output: {e}");
        r#"{"status":"error","content":"Internal serialization failure","content_type":"text"}"#.to_string()
    });

    let content = vec![Content::text(payload)];

    if is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for ConclaveServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "conclave".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::default()
            },
            instructions: Some(
                "AI-assisted engineering tools: chat, deep thinking, code review, debugging, \
                 refactoring, security audit, multi-model consensus, planning, tracing, test and \
                 documentation generation. Workflow tools pause between steps; pass the returned \
                 continuation_id to resume a conversation with any tool."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.registry.tools().map(|tool| self.describe(tool)).collect();

        Ok(ListToolsResult {
            tools,
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(tool) = self.registry.get(&request.name) else {
            return Err(McpError::invalid_params(
                format!("Unknown tool: '{}'", request.name),
                None,
            ));
        };

        let arguments = request
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        log::debug!("Dispatching tool '{}'", tool.name());

        let output = tool.execute(&self.env, arguments).await;

        if output.is_error() {
            log::warn!("Tool '{}' returned an error: {}", tool.name(), output.content);
        }

        Ok(to_call_result(output))
    }
}
