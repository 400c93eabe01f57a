//! Token-budgeted reconstruction of a thread chain into model context.

use std::collections::HashSet;

use llm::ModelCapability;
use llm::token::estimate_tokens;

use crate::files::read_file;
use crate::store::{ConversationStore, ThreadContext, Turn};

/// Fraction split of the usable window: conversation history, newly
/// referenced files, and the caller's own content.
const HISTORY_FRACTION: f64 = 0.6;
const FILE_FRACTION: f64 = 0.3;

/// Floor for the output reservation regardless of model size.
const MIN_RESERVED_OUTPUT: usize = 4_096;

/// Per-model token allocation for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Window minus the output reservation.
    pub total: usize,
    /// Share for reconstructed conversation history.
    pub history: usize,
    /// Share for newly embedded file content.
    pub files: usize,
    /// Share for the caller's prompt text.
    pub user: usize,
    /// Tokens reserved for the model's response.
    pub reserved_output: usize,
}

impl TokenBudget {
    /// Allocate the budget for a model.
    ///
    /// `reserved_output = min(max_output_tokens, 10% of window)`, floored at
    /// 4,096; the remainder splits 60/30/10.
    pub fn for_model(capability: &ModelCapability) -> Self {
        let reserved_output = capability
            .max_output_tokens
            .min(capability.context_window / 10)
            .max(MIN_RESERVED_OUTPUT);

        let total = capability.context_window.saturating_sub(reserved_output);

        Self {
            total,
            history: (total as f64 * HISTORY_FRACTION) as usize,
            files: (total as f64 * FILE_FRACTION) as usize,
            user: total - (total as f64 * HISTORY_FRACTION) as usize - (total as f64 * FILE_FRACTION) as usize,
            reserved_output,
        }
    }
}

/// The reconstructed history for a thread chain.
#[derive(Debug, Default)]
pub struct BuiltHistory {
    /// Oldest-to-newest rendering, empty for a fresh thread.
    pub text: String,
    /// Estimated tokens of `text`, embedded files excluded.
    pub tokens: usize,
    /// Estimated tokens spent on embedded file content, charged against the
    /// file budget.
    pub file_tokens: usize,
    /// Paths whose content is embedded in the history.
    pub embedded_files: Vec<String>,
}

struct NumberedTurn<'a> {
    number: usize,
    turn: &'a Turn,
}

/// Build the conversation-context string for a thread against a model's
/// budget.
///
/// Turns are collected newest-first so the most recent exchanges survive a
/// tight budget, then the rendering is reversed to read chronologically.
/// Each file mentioned anywhere in the chain is embedded once, at its newest
/// occurrence; older mentions become references.
pub fn build_history(
    store: &ConversationStore,
    thread: &ThreadContext,
    capability: &ModelCapability,
) -> BuiltHistory {
    let budget = TokenBudget::for_model(capability);
    let chain = store.chain(thread);

    let all_turns: Vec<NumberedTurn<'_>> = chain
        .iter()
        .flat_map(|context| context.turns.iter())
        .enumerate()
        .map(|(index, turn)| NumberedTurn {
            number: index + 1,
            turn,
        })
        .collect();

    if all_turns.is_empty() {
        return BuiltHistory::default();
    }

    let total_turns = all_turns.len();
    let mut embedded: HashSet<String> = HashSet::new();
    let mut embedded_files = Vec::new();
    let mut blocks: Vec<String> = Vec::new();
    let mut history_tokens = 0usize;
    let mut file_tokens = 0usize;

    for numbered in all_turns.iter().rev() {
        let mut block = render_turn(numbered);

        // Newest occurrence of each file gets its content; everything older
        // in the walk is a back-reference.
        let mut file_sections = String::new();

        for path in &numbered.turn.files {
            if embedded.contains(path) {
                file_sections.push_str(&format!("(file {path} referenced earlier)\n"));
                continue;
            }

            let (content, tokens) = read_file(path, true);
            let section = format!("=== FILE: {path} ===\n{content}\n=== END FILE ===\n");

            if file_tokens + tokens > budget.files {
                file_sections.push_str(&format!("(file {path} omitted: file budget exhausted)\n"));
                embedded.insert(path.clone());
                continue;
            }

            file_tokens += tokens;
            embedded.insert(path.clone());
            embedded_files.push(path.clone());
            file_sections.push_str(&section);
        }

        if !file_sections.is_empty() {
            block.push_str("\nFiles used in this turn:\n");
            block.push_str(&file_sections);
        }

        let block_tokens = estimate_tokens(&block);

        if history_tokens + block_tokens > budget.history {
            blocks.push(format!(
                "[{} earlier turn(s) omitted to fit the context window]",
                numbered.number
            ));
            break;
        }

        history_tokens += block_tokens;
        blocks.push(block);
    }

    blocks.reverse();

    let header = format!(
        "=== CONVERSATION HISTORY (CONTINUATION) ===\n\
         Thread: {}\n\
         Tool: {}\n\
         Total turns: {total_turns}\n\
         You are continuing this conversation thread from where it left off.\n",
        thread.thread_id, thread.tool_name
    );

    let footer = "=== END CONVERSATION HISTORY ===\n\
                  Continue the conversation by building on the context above. Do not repeat earlier \
                  analysis; provide new insights or answer the latest request directly.";

    let text = format!("{header}\n{}\n{footer}", blocks.join("\n\n"));
    let tokens = estimate_tokens(&text).saturating_sub(file_tokens);

    BuiltHistory {
        text,
        tokens,
        file_tokens,
        embedded_files,
    }
}

fn render_turn(numbered: &NumberedTurn<'_>) -> String {
    let turn = numbered.turn;

    let speaker = match turn.role {
        crate::store::Role::User => "Agent".to_string(),
        crate::store::Role::Assistant => {
            let model = turn.model_name.as_deref().unwrap_or("assistant model");
            match turn.provider {
                Some(provider) => format!("{model} ({provider})"),
                None => model.to_string(),
            }
        }
    };

    let via = turn
        .tool_name
        .as_deref()
        .map(|tool| format!(" using {tool}"))
        .unwrap_or_default();

    let mut block = format!("--- Turn {} ({speaker}{via}) ---\n", numbered.number);

    if !turn.images.is_empty() {
        block.push_str(&format!("Images in this turn: {}\n", turn.images.join(", ")));
    }

    // Consensus turns carry the individual model responses in metadata;
    // naming them lets later turns reason about who said what.
    if let Some(responses) = turn
        .model_metadata
        .get("individual_responses")
        .and_then(|v| v.as_array())
    {
        let consulted: Vec<String> = responses
            .iter()
            .filter(|r| r.get("status").and_then(|s| s.as_str()) == Some("success"))
            .map(|r| {
                let model = r.get("model").and_then(|m| m.as_str()).unwrap_or("unknown");
                match r.get("stance").and_then(|s| s.as_str()) {
                    Some(stance) if stance != "neutral" => format!("{model}:{stance}"),
                    _ => model.to_string(),
                }
            })
            .collect();

        if !consulted.is_empty() {
            block.push_str(&format!("Models consulted: {}\n", consulted.join(", ")));
        }
    }

    block.push_str(&turn.content);
    block
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config::{ConversationConfig, ProviderKind};

    use super::*;
    use crate::store::{Role, TurnData};

    fn test_store() -> ConversationStore {
        ConversationStore::new(&ConversationConfig {
            timeout_hours: 3,
            max_turns: 50,
        })
    }

    fn capability(context_window: usize, max_output: usize) -> ModelCapability {
        let mut capability = llm::Catalog::generic_capability("test-model", ProviderKind::Custom);
        capability.context_window = context_window;
        capability.max_output_tokens = max_output;
        capability
    }

    #[test]
    fn budget_reserves_output_with_floor() {
        let budget = TokenBudget::for_model(&capability(1_000_000, 65_536));

        assert_eq!(budget.reserved_output, 65_536);
        assert_eq!(budget.total, 1_000_000 - 65_536);

        // Small window: the 10% share loses to the 4,096 floor.
        let budget = TokenBudget::for_model(&capability(32_000, 8_192));
        assert_eq!(budget.reserved_output, 4_096);
    }

    #[test]
    fn budget_split_is_60_30_10() {
        let budget = TokenBudget::for_model(&capability(100_000, 8_192));

        assert_eq!(budget.reserved_output, 8_192);
        assert_eq!(budget.total, 91_808);
        assert_eq!(budget.history, 55_084);
        assert_eq!(budget.files, 27_542);
        assert_eq!(budget.user, budget.total - budget.history - budget.files);
    }

    #[test]
    fn empty_thread_builds_no_history() {
        let store = test_store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);
        let thread = store.get_thread(id).unwrap();

        let history = build_history(&store, &thread, &capability(100_000, 8_192));

        assert!(history.text.is_empty());
        assert_eq!(history.tokens, 0);
    }

    #[test]
    fn history_reads_oldest_to_newest() {
        let store = test_store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(id, Role::User, TurnData::new("first question"));
        store.add_turn(id, Role::Assistant, TurnData::new("first answer"));
        store.add_turn(id, Role::User, TurnData::new("second question"));

        let thread = store.get_thread(id).unwrap();
        let history = build_history(&store, &thread, &capability(100_000, 8_192));

        let first = history.text.find("first question").unwrap();
        let second = history.text.find("second question").unwrap();
        assert!(first < second);
        assert!(history.text.contains("--- Turn 1"));
        assert!(history.text.contains("--- Turn 3"));
    }

    #[test]
    fn turn_numbering_spans_the_parent_chain() {
        let store = test_store();
        let parent = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(parent, Role::User, TurnData::new("parent turn"));

        let child_id = store.create_thread("debug", serde_json::Map::new(), Some(parent));
        store.add_turn(child_id, Role::User, TurnData::new("child turn"));

        let child = store.get_thread(child_id).unwrap();
        let history = build_history(&store, &child, &capability(100_000, 8_192));

        let parent_position = history.text.find("parent turn").unwrap();
        let child_position = history.text.find("child turn").unwrap();
        assert!(parent_position < child_position);
        assert!(history.text.contains("--- Turn 2"));
    }

    #[test]
    fn tight_budget_drops_oldest_turns_with_a_note() {
        let store = test_store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        for i in 0..10 {
            store.add_turn(id, Role::User, TurnData::new(format!("turn {i}: {}", "words ".repeat(200))));
        }

        let thread = store.get_thread(id).unwrap();
        // ~3,500-token window keeps only the newest few turns.
        let mut small = capability(8_000, 4_096);
        small.max_output_tokens = 4_096;
        let history = build_history(&store, &thread, &small);

        assert!(history.text.contains("earlier turn(s) omitted"));
        assert!(history.text.contains("turn 9"));
        assert!(!history.text.contains("turn 0:"));
    }

    #[test]
    fn history_without_files_fits_the_history_budget() {
        let store = test_store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        for i in 0..20 {
            store.add_turn(id, Role::User, TurnData::new(format!("turn {i}: {}", "content ".repeat(100))));
        }

        let thread = store.get_thread(id).unwrap();
        let model = capability(50_000, 4_096);
        let history = build_history(&store, &thread, &model);
        let budget = TokenBudget::for_model(&model);

        // Header and footer ride on top of the per-turn accounting; keep a
        // small allowance for them.
        assert!(history.tokens <= budget.history + 200);
    }

    #[test]
    fn files_embed_once_at_newest_occurrence() {
        let store = test_store();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "shared file content").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let id = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(
            id,
            Role::User,
            TurnData {
                content: "first mention".to_string(),
                files: vec![path.clone()],
                ..Default::default()
            },
        );
        store.add_turn(
            id,
            Role::User,
            TurnData {
                content: "second mention".to_string(),
                files: vec![path.clone()],
                ..Default::default()
            },
        );

        let thread = store.get_thread(id).unwrap();
        let history = build_history(&store, &thread, &capability(100_000, 8_192));

        assert_eq!(history.text.matches("shared file content").count(), 1);
        assert_eq!(history.text.matches("referenced earlier").count(), 1);
        assert_eq!(history.embedded_files, vec![path]);

        // The embedded copy sits in the newest turn's block.
        let newest = history.text.find("second mention").unwrap();
        let content_position = history.text.find("shared file content").unwrap();
        assert!(content_position > newest);
    }

    #[test]
    fn consensus_turns_list_the_models_consulted() {
        let store = test_store();
        let id = store.create_thread("consensus", serde_json::Map::new(), None);

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "individual_responses".to_string(),
            serde_json::json!([
                {"model": "o3", "stance": "for", "status": "success"},
                {"model": "flash", "stance": "neutral", "status": "success"},
                {"model": "grok-3", "stance": "against", "status": "error"},
            ]),
        );

        store.add_turn(
            id,
            Role::Assistant,
            TurnData {
                content: "synthesis".to_string(),
                tool_name: Some("consensus".to_string()),
                model_metadata: metadata,
                ..Default::default()
            },
        );

        let thread = store.get_thread(id).unwrap();
        let history = build_history(&store, &thread, &capability(100_000, 8_192));

        assert!(history.text.contains("Models consulted: o3:for, flash"));
        assert!(!history.text.contains("grok-3"));
    }

    #[test]
    fn assistant_turns_name_the_model() {
        let store = test_store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(
            id,
            Role::Assistant,
            TurnData {
                content: "model reply".to_string(),
                tool_name: Some("chat".to_string()),
                provider: Some(ProviderKind::Google),
                model_name: Some("gemini-2.5-flash".to_string()),
                ..Default::default()
            },
        );

        let thread = store.get_thread(id).unwrap();
        let history = build_history(&store, &thread, &capability(100_000, 8_192));

        assert!(history.text.contains("gemini-2.5-flash (google) using chat"));
    }
}
