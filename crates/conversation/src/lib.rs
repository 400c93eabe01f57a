//! Cross-tool conversation memory.
//!
//! A process-wide, in-memory store of threaded conversations shared by every
//! tool, plus the token-budgeted machinery that reconstructs a thread into
//! model context: history building, file reading with line markers, and
//! deduplicated file embedding.
//!
//! Nothing here persists across restarts by design.

mod files;
mod history;
mod store;

use thiserror::Error;

pub use files::{
    PreparedFiles, format_line_numbers, is_absolute_path, prepare_file_content, read_file, read_files,
    strip_line_markers,
};
pub use history::{BuiltHistory, TokenBudget, build_history};
pub use store::{ConversationStore, Role, ThreadContext, Turn, TurnData};

/// Errors surfaced by the conversation layer.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// A caller-supplied path was not absolute. This is a hard contract at
    /// the tool boundary, not a soft failure.
    #[error("All file paths must be absolute. Received: {0}")]
    RelativePath(String),
}
