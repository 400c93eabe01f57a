//! File reading with line markers and token-budgeted embedding.

use std::path::Path;

use llm::token::estimate_tokens;
use uuid::Uuid;

use crate::{ConversationError, ConversationStore};

/// Line-number marker glyph. The marker occupies the first characters of
/// every embedded source line and exists purely so models can anchor replies
/// to exact lines; generated code must never contain it.
const LINE_MARKER: char = '│';

/// Whether a path is absolute on either POSIX or Windows conventions.
///
/// Drive-rooted Windows paths (`C:\...` or `C:/...`) count as absolute even
/// when the server itself runs on a POSIX host.
pub fn is_absolute_path(path: &str) -> bool {
    if Path::new(path).is_absolute() {
        return true;
    }

    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Prefix each line with a right-padded 1-based `{n:>4}│ ` marker.
///
/// Newlines are preserved verbatim; only prefixes are added.
pub fn format_line_numbers(content: &str) -> String {
    let segments: Vec<&str> = content.split('\n').collect();
    let last = segments.len() - 1;
    let mut result = String::with_capacity(content.len() + segments.len() * 7);

    for (index, line) in segments.iter().enumerate() {
        if index > 0 {
            result.push('\n');
        }
        // A trailing newline produces one empty final segment; that is not a
        // line and gets no marker.
        if index == last && index > 0 && line.is_empty() {
            continue;
        }
        result.push_str(&format!("{:>4}{LINE_MARKER} {line}", index + 1));
    }

    result
}

/// Remove `{n:>4}│ ` markers, recovering the original content.
pub fn strip_line_markers(content: &str) -> String {
    content
        .split('\n')
        .map(|line| match line.char_indices().find(|(_, c)| *c == LINE_MARKER) {
            Some((index, _))
                if !line[..index].trim().is_empty()
                    && line[..index].trim().chars().all(|c| c.is_ascii_digit()) =>
            {
                let after = &line[index + LINE_MARKER.len_utf8()..];
                after.strip_prefix(' ').unwrap_or(after)
            }
            _ => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read one file into embeddable text.
///
/// Returns the content plus its estimated token count. Non-absolute paths
/// yield an `<invalid_path>` marker and unreadable files a `<read error: …>`
/// marker; both let the caller continue with the rest of its file list.
pub fn read_file(path: &str, line_numbers: bool) -> (String, usize) {
    if !is_absolute_path(path) {
        let content = format!("<invalid_path: must be absolute, got '{path}'>");
        let tokens = estimate_tokens(&content);
        return (content, tokens);
    }

    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let content = if line_numbers { format_line_numbers(&raw) } else { raw };
            let tokens = estimate_tokens(&content);
            (content, tokens)
        }
        Err(e) => {
            log::debug!("Failed to read '{path}': {e}");
            let content = format!("<read error: {e}>");
            let tokens = estimate_tokens(&content);
            (content, tokens)
        }
    }
}

/// Concatenate files under `=== FILE: … ===` wrappers, stopping before the
/// first file whose inclusion would exceed the token budget.
///
/// Once the budget would be exceeded no further files are added; the call
/// returns whatever fit. Files are never truncated mid-content.
pub fn read_files(paths: &[String], budget_tokens: usize, line_numbers: bool) -> String {
    read_files_with_manifest(paths, budget_tokens, line_numbers).0
}

/// [`read_files`] plus the list of paths that were actually embedded, for
/// callers that record the manifest for the next turn.
fn read_files_with_manifest(
    paths: &[String],
    budget_tokens: usize,
    line_numbers: bool,
) -> (String, Vec<String>) {
    let mut result = String::new();
    let mut included = Vec::new();
    let mut spent = 0usize;

    for path in paths {
        let (content, _) = read_file(path, line_numbers);
        let wrapped = format!("=== FILE: {path} ===\n{content}\n=== END FILE ===\n");
        let cost = estimate_tokens(&wrapped);

        if spent + cost > budget_tokens {
            log::debug!("Token budget exhausted before '{path}' ({cost} tokens over)");
            break;
        }

        spent += cost;
        result.push_str(&wrapped);
        included.push(path.clone());
    }

    (result, included)
}

/// Result of preparing new file content for a prompt.
#[derive(Debug, Default)]
pub struct PreparedFiles {
    /// The labeled content block, empty when nothing was embedded.
    pub content: String,
    /// Paths whose content was actually embedded this turn.
    pub included: Vec<String>,
    /// Paths skipped because the thread history already embeds them.
    pub already_in_history: Vec<String>,
}

/// Embed the content of `paths` for a prompt, skipping files the
/// conversation already carries (newest-wins dedup) and stopping at the
/// token budget.
///
/// Any relative path is a hard validation error; tools surface it verbatim.
pub fn prepare_file_content(
    store: &ConversationStore,
    continuation: Option<Uuid>,
    paths: &[String],
    budget_tokens: usize,
    label: &str,
) -> Result<PreparedFiles, ConversationError> {
    for path in paths {
        if !is_absolute_path(path) {
            return Err(ConversationError::RelativePath(path.clone()));
        }
    }

    let history_files: Vec<String> = continuation
        .and_then(|id| store.get_thread(id))
        .map(|thread| store.conversation_file_list(&thread))
        .unwrap_or_default();

    let mut prepared = PreparedFiles::default();
    let mut fresh = Vec::new();

    for path in paths {
        if history_files.contains(path) {
            log::debug!("Skipping '{path}': already embedded in conversation history");
            prepared.already_in_history.push(path.clone());
        } else {
            fresh.push(path.clone());
        }
    }

    if fresh.is_empty() {
        return Ok(prepared);
    }

    let (body, included) = read_files_with_manifest(&fresh, budget_tokens, true);
    prepared.included = included;

    if !body.is_empty() {
        prepared.content = format!("--- BEGIN {label} ---\n{body}--- END {label} ---");
    }

    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config::ConversationConfig;

    use super::*;
    use crate::store::{Role, TurnData};

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn test_store() -> ConversationStore {
        ConversationStore::new(&ConversationConfig {
            timeout_hours: 3,
            max_turns: 50,
        })
    }

    #[test]
    fn windows_drive_paths_count_as_absolute() {
        assert!(is_absolute_path("/home/user/file.rs"));
        assert!(is_absolute_path("C:\\projects\\file.rs"));
        assert!(is_absolute_path("D:/projects/file.rs"));
        assert!(!is_absolute_path("./file.rs"));
        assert!(!is_absolute_path("file.rs"));
        assert!(!is_absolute_path("../up.rs"));
    }

    #[test]
    fn line_numbers_are_right_padded_and_one_based() {
        let formatted = format_line_numbers("fn main() {\n    body\n}");

        assert_eq!(formatted, "   1│ fn main() {\n   2│     body\n   3│ }");
    }

    #[test]
    fn line_numbers_wide_files_keep_alignment() {
        let content = (1..=1000).map(|_| "x").collect::<Vec<_>>().join("\n");
        let formatted = format_line_numbers(&content);

        assert!(formatted.starts_with("   1│ x"));
        assert!(formatted.contains("\n  99│ x"));
        assert!(formatted.contains("\n 100│ x"));
        assert!(formatted.ends_with("1000│ x"));
    }

    #[test]
    fn line_marker_round_trip() {
        let original = "fn main() {\n    let x = 1;\n\n}\n";
        let marked = format_line_numbers(original);

        assert_eq!(strip_line_markers(&marked), original);
    }

    #[test]
    fn stray_marker_in_content_survives_stripping() {
        // Only lines whose prefix is a right-aligned number are unmarked.
        let line = "let s = \"a│b\";";
        assert_eq!(strip_line_markers(line), line);
    }

    #[test]
    fn read_file_flags_relative_paths() {
        let (content, _) = read_file("./relative.rs", false);
        assert!(content.starts_with("<invalid_path"));
    }

    #[test]
    fn read_file_reports_unreadable_files_softly() {
        let (content, _) = read_file("/definitely/not/here.rs", false);
        assert!(content.starts_with("<read error:"));
    }

    #[test]
    fn read_file_round_trips_against_plain_read() {
        let file = temp_file("alpha\nbeta\n");
        let path = file.path().to_str().unwrap();

        let (with_markers, _) = read_file(path, true);
        let (plain, _) = read_file(path, false);

        assert_eq!(strip_line_markers(&with_markers), plain);
    }

    #[test]
    fn read_files_stops_at_the_first_file_over_budget() {
        let first = temp_file("tiny\n");
        let large = temp_file(&"x".repeat(4_000));
        let trailing = temp_file("also small\n");

        let paths = vec![
            first.path().to_str().unwrap().to_string(),
            large.path().to_str().unwrap().to_string(),
            trailing.path().to_str().unwrap().to_string(),
        ];

        // Budget fits the wrapped small file but not the large one; nothing
        // after the stopping point is added, even if it would fit.
        let result = read_files(&paths, 60, false);

        assert!(result.contains("tiny"));
        assert!(!result.contains("xxxx"));
        assert!(!result.contains("also small"));
    }

    #[test]
    fn read_files_returns_everything_within_budget() {
        let first = temp_file("alpha\n");
        let second = temp_file("beta\n");

        let paths = vec![
            first.path().to_str().unwrap().to_string(),
            second.path().to_str().unwrap().to_string(),
        ];

        let result = read_files(&paths, 10_000, false);

        assert!(result.contains("alpha"));
        assert!(result.contains("beta"));
        assert_eq!(result.matches("=== END FILE ===").count(), 2);
    }

    #[test]
    fn prepare_rejects_relative_paths_hard() {
        let store = test_store();
        let error = prepare_file_content(&store, None, &["./a.py".to_string()], 10_000, "CONTEXT FILES")
            .expect_err("relative path must fail");

        let message = error.to_string();
        assert!(message.contains("./a.py"));
        assert!(message.contains("must be absolute"));
    }

    #[test]
    fn prepare_skips_files_already_in_history() {
        let store = test_store();
        let file = temp_file("content\n");
        let path = file.path().to_str().unwrap().to_string();

        let id = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(
            id,
            Role::User,
            TurnData {
                content: "used the file".to_string(),
                files: vec![path.clone()],
                ..Default::default()
            },
        );

        let prepared =
            prepare_file_content(&store, Some(id), std::slice::from_ref(&path), 10_000, "CONTEXT FILES").unwrap();

        assert!(prepared.content.is_empty());
        assert!(prepared.included.is_empty());
        assert_eq!(prepared.already_in_history, vec![path]);
    }

    #[test]
    fn prepare_embeds_fresh_files_with_label() {
        let store = test_store();
        let file = temp_file("fresh content\n");
        let path = file.path().to_str().unwrap().to_string();

        let prepared =
            prepare_file_content(&store, None, std::slice::from_ref(&path), 10_000, "CONTEXT FILES").unwrap();

        assert_eq!(prepared.included, vec![path.clone()]);
        assert!(prepared.content.starts_with("--- BEGIN CONTEXT FILES ---"));
        assert!(prepared.content.contains(&format!("=== FILE: {path} ===")));
        assert!(prepared.content.contains("fresh content"));
        assert!(prepared.content.ends_with("--- END CONTEXT FILES ---"));
    }

    #[test]
    fn prepare_preserves_caller_order_and_respects_budget() {
        let store = test_store();
        let first = temp_file(&"a".repeat(400));
        let second = temp_file(&"b".repeat(400));
        let third = temp_file("small\n");

        let paths = vec![
            first.path().to_str().unwrap().to_string(),
            second.path().to_str().unwrap().to_string(),
            third.path().to_str().unwrap().to_string(),
        ];

        // Enough budget for roughly one wrapped 400-char file.
        let prepared = prepare_file_content(&store, None, &paths, 160, "CONTEXT FILES").unwrap();

        assert_eq!(prepared.included, vec![paths[0].clone()]);
    }
}
