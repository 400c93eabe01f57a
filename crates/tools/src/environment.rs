//! Shared process state handed to every tool invocation.

use std::sync::Arc;

use config::Config;
use conversation::ConversationStore;
use llm::ProviderRegistry;

/// Everything a tool needs beyond its own arguments.
///
/// One instance per process, built at bootstrap and cloned (cheaply) per
/// dispatch.
#[derive(Clone)]
pub struct ToolEnv {
    pub config: Arc<Config>,
    pub registry: Arc<ProviderRegistry>,
    pub store: Arc<ConversationStore>,
}

impl ToolEnv {
    pub fn new(config: Config, registry: ProviderRegistry) -> Self {
        let store = ConversationStore::new(&config.conversation);

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            store: Arc::new(store),
        }
    }

    /// Test environments swap in scripted registries.
    pub fn with_parts(config: Config, registry: ProviderRegistry, store: ConversationStore) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            store: Arc::new(store),
        }
    }
}
