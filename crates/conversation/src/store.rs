//! The in-memory thread store.

use std::collections::HashSet;

use config::{ConversationConfig, ProviderKind};
use dashmap::DashMap;
use jiff::Timestamp;
use uuid::Uuid;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Lowercase name used in history rendering and metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in a thread.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
    /// Absolute paths referenced by this turn.
    pub files: Vec<String>,
    /// Absolute paths or data URLs.
    pub images: Vec<String>,
    /// The tool that produced the turn, for cross-tool continuation display.
    pub tool_name: Option<String>,
    pub provider: Option<ProviderKind>,
    pub model_name: Option<String>,
    pub model_metadata: serde_json::Map<String, serde_json::Value>,
}

/// Payload for appending a turn, so call sites name what they set.
#[derive(Debug, Default)]
pub struct TurnData {
    pub content: String,
    pub files: Vec<String>,
    pub images: Vec<String>,
    pub tool_name: Option<String>,
    pub provider: Option<ProviderKind>,
    pub model_name: Option<String>,
    pub model_metadata: serde_json::Map<String, serde_json::Value>,
}

impl TurnData {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A conversation thread. Turns are append-only; parents form a DAG rooted at
/// a thread with no parent.
#[derive(Debug, Clone)]
pub struct ThreadContext {
    pub thread_id: Uuid,
    pub parent_thread_id: Option<Uuid>,
    pub created_at: Timestamp,
    pub last_updated_at: Timestamp,
    /// Tool that opened the thread.
    pub tool_name: String,
    /// Arbitrary context captured at creation (the initial request fields).
    pub initial_context: serde_json::Map<String, serde_json::Value>,
    pub turns: Vec<Turn>,
}

/// Thread-safe, process-wide conversation store.
///
/// The map is sharded (`DashMap`); per-entry locks serialize turn appends for
/// a thread while leaving readers of other threads untouched. Expiry is
/// lazy: expired threads are dropped when next accessed.
pub struct ConversationStore {
    threads: DashMap<Uuid, ThreadContext>,
    ttl_seconds: i64,
    max_turns: usize,
}

impl ConversationStore {
    pub fn new(config: &ConversationConfig) -> Self {
        Self {
            threads: DashMap::new(),
            ttl_seconds: config.timeout_hours as i64 * 3_600,
            max_turns: config.max_turns,
        }
    }

    /// Create a new thread and return its id.
    pub fn create_thread(
        &self,
        tool_name: &str,
        initial_context: serde_json::Map<String, serde_json::Value>,
        parent: Option<Uuid>,
    ) -> Uuid {
        let thread_id = Uuid::new_v4();
        let now = Timestamp::now();

        let context = ThreadContext {
            thread_id,
            parent_thread_id: parent,
            created_at: now,
            last_updated_at: now,
            tool_name: tool_name.to_string(),
            initial_context,
            turns: Vec::new(),
        };

        self.threads.insert(thread_id, context);
        log::debug!("Created thread {thread_id} for tool '{tool_name}' (parent: {parent:?})");

        thread_id
    }

    /// Fetch a thread. Expired threads are evicted and reported as absent.
    pub fn get_thread(&self, id: Uuid) -> Option<ThreadContext> {
        let expired = {
            let entry = self.threads.get(&id)?;
            self.is_expired(&entry)
        };

        if expired {
            log::debug!("Thread {id} expired, evicting");
            self.threads.remove(&id);
            return None;
        }

        self.threads.get(&id).map(|entry| entry.clone())
    }

    /// Append a turn. Returns `false` when the thread is absent, expired, or
    /// at its turn cap; the caller proceeds without stored history.
    pub fn add_turn(&self, id: Uuid, role: Role, data: TurnData) -> bool {
        let Some(mut entry) = self.threads.get_mut(&id) else {
            log::debug!("add_turn: thread {id} not found");
            return false;
        };

        if self.is_expired(&entry) {
            log::debug!("add_turn: thread {id} expired");
            return false;
        }

        if entry.turns.len() >= self.max_turns {
            log::debug!("add_turn: thread {id} reached the {} turn cap", self.max_turns);
            return false;
        }

        entry.turns.push(Turn {
            role,
            content: data.content,
            timestamp: Timestamp::now(),
            files: data.files,
            images: data.images,
            tool_name: data.tool_name,
            provider: data.provider,
            model_name: data.model_name,
            model_metadata: data.model_metadata,
        });
        entry.last_updated_at = Timestamp::now();

        true
    }

    /// Resolve the parent chain, root first, ending with the given thread.
    ///
    /// A visited set guards against cycles; expired parents simply truncate
    /// the chain.
    pub fn chain(&self, thread: &ThreadContext) -> Vec<ThreadContext> {
        let mut chain = vec![thread.clone()];
        let mut visited: HashSet<Uuid> = HashSet::from([thread.thread_id]);
        let mut parent_id = thread.parent_thread_id;

        while let Some(id) = parent_id {
            if !visited.insert(id) {
                log::warn!("Cycle detected in thread chain at {id}");
                break;
            }

            let Some(parent) = self.get_thread(id) else {
                break;
            };

            parent_id = parent.parent_thread_id;
            chain.push(parent);
        }

        chain.reverse();
        chain
    }

    /// All file paths referenced across the chain, deduplicated so only the
    /// newest turn mentioning a file contributes it. Ordered newest-first.
    pub fn conversation_file_list(&self, thread: &ThreadContext) -> Vec<String> {
        self.collect_newest_first(thread, |turn| &turn.files)
    }

    /// Same newest-first semantics for images.
    pub fn conversation_image_list(&self, thread: &ThreadContext) -> Vec<String> {
        self.collect_newest_first(thread, |turn| &turn.images)
    }

    fn collect_newest_first(
        &self,
        thread: &ThreadContext,
        select: impl Fn(&Turn) -> &Vec<String>,
    ) -> Vec<String> {
        let chain = self.chain(thread);
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for context in chain.iter().rev() {
            for turn in context.turns.iter().rev() {
                for path in select(turn) {
                    if seen.insert(path.clone()) {
                        result.push(path.clone());
                    }
                }
            }
        }

        result
    }

    fn is_expired(&self, thread: &ThreadContext) -> bool {
        let age = Timestamp::now().as_second() - thread.last_updated_at.as_second();
        age > self.ttl_seconds
    }

    #[cfg(test)]
    fn force_expire(&self, id: Uuid) {
        if let Some(mut entry) = self.threads.get_mut(&id) {
            entry.last_updated_at = Timestamp::from_second(0).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::new(&ConversationConfig {
            timeout_hours: 3,
            max_turns: 5,
        })
    }

    fn turn_with_files(content: &str, files: &[&str]) -> TurnData {
        TurnData {
            content: content.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn create_and_fetch_round_trip() {
        let store = store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        let thread = store.get_thread(id).unwrap();
        assert_eq!(thread.tool_name, "chat");
        assert_eq!(thread.parent_thread_id, None);
        assert!(thread.turns.is_empty());
    }

    #[test]
    fn missing_thread_is_absent() {
        let store = store();
        assert!(store.get_thread(Uuid::new_v4()).is_none());
    }

    #[test]
    fn add_turn_appends_in_order() {
        let store = store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        assert!(store.add_turn(id, Role::User, TurnData::new("question")));
        assert!(store.add_turn(id, Role::Assistant, TurnData::new("answer")));

        let thread = store.get_thread(id).unwrap();
        assert_eq!(thread.turns.len(), 2);
        assert_eq!(thread.turns[0].role, Role::User);
        assert_eq!(thread.turns[1].content, "answer");
    }

    #[test]
    fn turn_cap_fails_non_fatally() {
        let store = store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        for i in 0..5 {
            assert!(store.add_turn(id, Role::User, TurnData::new(format!("turn {i}"))));
        }

        assert!(!store.add_turn(id, Role::User, TurnData::new("one too many")));
        assert_eq!(store.get_thread(id).unwrap().turns.len(), 5);
    }

    #[test]
    fn expired_threads_are_transparently_absent() {
        let store = store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);
        store.force_expire(id);

        assert!(store.get_thread(id).is_none());
        assert!(!store.add_turn(id, Role::User, TurnData::new("late")));
    }

    #[test]
    fn chain_orders_parent_turns_first() {
        let store = store();
        let parent = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(parent, Role::User, TurnData::new("parent turn"));

        let child_id = store.create_thread("debug", serde_json::Map::new(), Some(parent));
        store.add_turn(child_id, Role::User, TurnData::new("child turn"));

        let child = store.get_thread(child_id).unwrap();
        let chain = store.chain(&child);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].thread_id, parent);
        assert_eq!(chain[1].thread_id, child_id);
    }

    #[test]
    fn file_list_keeps_only_newest_occurrence() {
        let store = store();
        let id = store.create_thread("chat", serde_json::Map::new(), None);

        store.add_turn(id, Role::User, turn_with_files("t1", &["/a.rs", "/b.rs"]));
        store.add_turn(id, Role::User, turn_with_files("t2", &["/b.rs", "/c.rs"]));

        let thread = store.get_thread(id).unwrap();
        let files = store.conversation_file_list(&thread);

        // Newest-first: turn 2's files lead, /b.rs appears once.
        assert_eq!(files, vec!["/b.rs", "/c.rs", "/a.rs"]);
    }

    #[test]
    fn file_list_spans_the_parent_chain() {
        let store = store();
        let parent = store.create_thread("chat", serde_json::Map::new(), None);
        store.add_turn(parent, Role::User, turn_with_files("p", &["/old.rs", "/shared.rs"]));

        let child_id = store.create_thread("debug", serde_json::Map::new(), Some(parent));
        store.add_turn(child_id, Role::User, turn_with_files("c", &["/shared.rs", "/new.rs"]));

        let child = store.get_thread(child_id).unwrap();
        let files = store.conversation_file_list(&child);

        assert_eq!(files, vec!["/shared.rs", "/new.rs", "/old.rs"]);
    }

    #[test]
    fn cyclic_parent_links_terminate() {
        let store = store();
        let a = store.create_thread("chat", serde_json::Map::new(), None);

        // Manufacture a cycle by pointing the root at its own child.
        let b = store.create_thread("chat", serde_json::Map::new(), Some(a));
        if let Some(mut entry) = store.threads.get_mut(&a) {
            entry.parent_thread_id = Some(b);
        }

        let thread = store.get_thread(b).unwrap();
        let chain = store.chain(&thread);

        assert_eq!(chain.len(), 2);
    }
}
