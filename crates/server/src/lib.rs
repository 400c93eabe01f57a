//! The MCP stdio shell.
//!
//! Wraps the tool registry in an rmcp [`ServerHandler`]: `tools/list`
//! enumerates schemas, `tools/call` dispatches by name, and every failure is
//! rewritten into a `{status: "error"}` JSON payload so nothing ever raises
//! across the MCP boundary.

mod handler;

pub use handler::ConclaveServer;

use std::sync::Arc;

use rmcp::ServiceExt;
use tools::{ToolEnv, ToolRegistry};

/// Serve the tool registry over stdio until the host disconnects.
///
/// stdout carries MCP framing exclusively; all logging goes to stderr.
pub async fn serve_stdio(env: ToolEnv, registry: ToolRegistry) -> anyhow::Result<()> {
    let server = ConclaveServer::new(env, Arc::new(registry));

    log::info!("Serving MCP over stdio with {} tools", server.tool_count());

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))?;

    service.waiting().await?;

    log::info!("MCP host disconnected, shutting down");

    Ok(())
}
