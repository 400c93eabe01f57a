use clap::Parser;

/// Command-line arguments. Configuration beyond logging comes from the
/// environment (see the README's variable table).
#[derive(Debug, Parser)]
#[command(name = "conclave", version, about = "MCP server for AI-assisted engineering tools")]
pub struct Args {
    /// stderr log verbosity: trace, debug, info, warn, error. Overrides
    /// LOG_LEVEL.
    #[arg(long)]
    pub log_level: Option<String>,
}
