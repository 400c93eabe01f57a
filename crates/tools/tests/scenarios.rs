//! End-to-end tool scenarios against a scripted in-process provider.
//!
//! No network: the provider returns canned content and records every
//! request so tests can assert on prompts, call counts, and metadata.

use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use config::{Config, ProviderKind};
use llm::{Catalog, GenerationRequest, LlmError, ModelCapability, ModelResponse, Provider, ProviderRegistry};
use tools::{Tool, ToolEnv, ToolOutput, ToolRegistry};

struct ScriptedProvider {
    kind: ProviderKind,
    reply: String,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedProvider {
    fn new(kind: ProviderKind, reply: &str) -> (Arc<Self>, Arc<Mutex<Vec<GenerationRequest>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(Self {
            kind,
            reply: reply.to_string(),
            calls: calls.clone(),
        });

        (provider, calls)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn validate_model(&self, name: &str) -> bool {
        Catalog::builtin(self.kind).capabilities(name).is_some()
    }

    fn capabilities(&self, name: &str) -> Option<ModelCapability> {
        Catalog::builtin(self.kind).capabilities(name).cloned()
    }

    async fn generate(&self, request: GenerationRequest) -> Result<ModelResponse, LlmError> {
        let capability = self
            .capabilities(&request.model)
            .ok_or_else(|| LlmError::ModelUnavailable {
                requested: request.model.clone(),
                detail: "not in scripted catalog".to_string(),
            })?;

        self.calls.lock().unwrap().push(request);

        Ok(ModelResponse {
            content: self.reply.clone(),
            usage: None,
            model_name: capability.name.clone(),
            friendly_name: capability.friendly_name.clone(),
            provider: self.kind,
            metadata: serde_json::Map::new(),
        })
    }
}

fn auto_config() -> Config {
    Config::default()
}

fn env_with_google(reply: &str) -> (ToolEnv, Arc<Mutex<Vec<GenerationRequest>>>) {
    let config = auto_config();
    let mut registry = ProviderRegistry::empty(config.providers.clone());
    let (provider, calls) = ScriptedProvider::new(ProviderKind::Google, reply);
    registry.register(ProviderKind::Google, provider);

    (ToolEnv::new(config, registry), calls)
}

fn env_without_providers() -> ToolEnv {
    let config = auto_config();
    let registry = ProviderRegistry::empty(config.providers.clone());
    ToolEnv::new(config, registry)
}

// One registry per test: workflow runners keep per-thread step state, so
// multi-step scenarios must dispatch through the same instance.
async fn call_on(registry: &ToolRegistry, env: &ToolEnv, tool: &str, arguments: Value) -> ToolOutput {
    registry.get(tool).expect("tool registered").execute(env, arguments).await
}

async fn call(env: &ToolEnv, tool: &str, arguments: Value) -> ToolOutput {
    let registry = ToolRegistry::with_default_tools();
    call_on(&registry, env, tool, arguments).await
}

fn body(output: &ToolOutput) -> Value {
    serde_json::from_str(&output.content).expect("JSON tool output")
}

// S1: chat, single turn.
#[tokio::test]
async fn chat_single_turn_resolves_a_gemini_model() {
    let (env, calls) = env_with_google("CRDTs are conflict-free replicated data types.");

    let output = call(&env, "chat", json!({"prompt": "Explain CRDTs", "model": "flash"})).await;

    assert_eq!(output.status, "success");
    assert!(!output.content.is_empty());
    assert_eq!(output.metadata["model_name"], "gemini-2.5-flash");
    assert_eq!(output.metadata["provider"], "google");
    assert!(output.continuation_id.is_none());
    assert_eq!(calls.lock().unwrap().len(), 1);

    // The chat footer invites the agent to take its turn.
    assert!(output.content.contains("**Agent's Turn:**"));
}

// S2: relative path rejected.
#[tokio::test]
async fn chat_rejects_relative_paths() {
    let (env, calls) = env_with_google("unused");

    let output = call(&env, "chat", json!({"prompt": "x", "files": ["./a.py"], "model": "flash"})).await;

    assert_eq!(output.status, "error");
    assert!(output.content.contains("./a.py"));
    assert!(output.content.contains("must be absolute"));
    assert!(calls.lock().unwrap().is_empty());
}

// S3: auto mode without a model short-circuits.
#[tokio::test]
async fn chat_auto_mode_names_available_models() {
    let (env, calls) = env_with_google("unused");

    let output = call(&env, "chat", json!({"prompt": "x"})).await;

    assert_eq!(output.status, "error");
    assert!(output.content.contains("Model 'auto' is not available"));
    assert!(output.content.contains("gemini-2.5-flash"));
    assert!(calls.lock().unwrap().is_empty());
}

// S4: debug workflow with certain confidence skips the expert.
#[tokio::test]
async fn debug_certain_confidence_skips_expert_analysis() {
    let (env, calls) = env_with_google("unused");
    let registry = ToolRegistry::with_default_tools();

    let first = call_on(
        &registry,
        &env,
        "debug",
        json!({
            "step": "Investigating a KeyError in the request handler",
            "step_number": 1,
            "total_steps": 3,
            "next_step_required": true,
            "findings": "The error originates in auth middleware",
            "model": "pro",
        }),
    )
    .await;

    assert_eq!(first.status, "pause_for_investigation");
    let continuation = first.continuation_id.clone().unwrap();

    let second = call_on(
        &registry,
        &env,
        "debug",
        json!({
            "step": "Examined the middleware",
            "step_number": 2,
            "total_steps": 3,
            "next_step_required": true,
            "findings": "hashlib is referenced but never imported",
            "confidence": "high",
            "continuation_id": continuation,
            "model": "pro",
        }),
    )
    .await;

    assert_eq!(second.status, "pause_for_investigation");

    let third = call_on(
        &registry,
        &env,
        "debug",
        json!({
            "step": "Confirmed the root cause",
            "step_number": 3,
            "total_steps": 3,
            "next_step_required": false,
            "findings": "Missing import confirmed by traceback",
            "confidence": "certain",
            "hypothesis": "Missing import hashlib",
            "continuation_id": continuation,
            "model": "pro",
        }),
    )
    .await;

    assert_eq!(third.status, "certain_confidence_proceed_with_fix");

    let payload = body(&third);
    assert_eq!(payload["expert_analysis"]["status"], "skipped_due_to_certain_confidence");
    assert_eq!(payload["complete_investigation"]["confidence_level"], "certain");
    assert_eq!(payload["complete_investigation"]["final_analysis"], "Missing import hashlib");

    // Certainty means no provider call was ever made.
    assert!(calls.lock().unwrap().is_empty());
}

// S5: consensus stance dedup.
#[tokio::test]
async fn consensus_caps_duplicate_model_stance_pairs() {
    let config = auto_config();
    let mut registry = ProviderRegistry::empty(config.providers.clone());
    let (provider, calls) = ScriptedProvider::new(ProviderKind::Openai, "## Verdict\nFeasible.");
    registry.register(ProviderKind::Openai, provider);
    let env = ToolEnv::new(config, registry);

    let output = call(
        &env,
        "consensus",
        json!({
            "prompt": "Should we migrate the queue to a log-structured design?",
            "models": [
                {"model": "o3", "stance": "for"},
                {"model": "o3", "stance": "for"},
                {"model": "o3", "stance": "for"},
            ],
        }),
    )
    .await;

    assert_eq!(output.status, "consensus_success");

    let payload = body(&output);
    assert_eq!(payload["models_used"].as_array().unwrap().len(), 2);
    assert_eq!(payload["models_skipped"][0], "o3:for (max 2 instances)");
    assert_eq!(calls.lock().unwrap().len(), 2);

    // Responses preserve input order and stance labels.
    assert_eq!(payload["responses"][0]["stance"], "for");
    assert_eq!(payload["responses"][1]["status"], "success");
}

// S6: planner works with no providers at all.
#[tokio::test]
async fn planner_completes_without_any_provider() {
    let env = env_without_providers();

    let output = call(
        &env,
        "planner",
        json!({
            "step": "Design the rollout plan for the new storage engine",
            "step_number": 1,
            "total_steps": 1,
            "next_step_required": false,
        }),
    )
    .await;

    assert_eq!(output.status, "planning_success");
    assert!(output.continuation_id.is_some());

    let payload = body(&output);
    assert_eq!(payload["expert_analysis"]["status"], "skipped_by_tool_design");
}

// Expert analysis dispatch: a completed debug at high confidence consults
// the model and folds its reply in.
#[tokio::test]
async fn debug_high_confidence_consults_the_expert() {
    let (env, calls) = env_with_google(r#"{"status": "analysis_complete", "root_cause": "missing import"}"#);

    let output = call(
        &env,
        "debug",
        json!({
            "step": "Full investigation in one step",
            "step_number": 1,
            "total_steps": 1,
            "next_step_required": false,
            "findings": "Traced the failure to the crypto helper",
            "relevant_files": ["/src/auth.py"],
            "confidence": "high",
            "hypothesis": "hashlib import missing",
            "model": "pro",
        }),
    )
    .await;

    assert_eq!(output.status, "calling_expert_analysis");

    let payload = body(&output);
    assert_eq!(payload["expert_analysis"]["root_cause"], "missing import");

    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].prompt.contains("HYPOTHESIS EVOLUTION"));
    assert!(recorded[0].prompt.contains("hashlib import missing"));
}

// Property 4: files already in history are not re-embedded.
#[tokio::test]
async fn continuation_does_not_reembed_history_files() {
    let (env, calls) = env_with_google("answer");

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "unique-sentinel-content-12345").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    // Seed a thread whose history already carries the file.
    let thread_id = env.store.create_thread("chat", serde_json::Map::new(), None);
    env.store.add_turn(
        thread_id,
        conversation::Role::User,
        conversation::TurnData {
            content: "earlier turn".to_string(),
            files: vec![path.clone()],
            ..Default::default()
        },
    );

    let output = call(
        &env,
        "chat",
        json!({
            "prompt": "continue with the same file",
            "files": [path],
            "model": "flash",
            "continuation_id": thread_id.to_string(),
        }),
    )
    .await;

    assert_eq!(output.status, "continuation_available");
    assert_eq!(output.continuation_id.as_deref(), Some(thread_id.to_string().as_str()));

    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);

    // The history embeds the content once; the new-files block must not
    // duplicate it.
    let embeddings = recorded[0].prompt.matches("unique-sentinel-content-12345").count();
    assert_eq!(embeddings, 1);
    assert!(!recorded[0].prompt.contains("BEGIN CONTEXT FILES"));
}

// Stale continuation ids warn and start a fresh thread.
#[tokio::test]
async fn stale_continuation_creates_a_fresh_thread() {
    let (env, _) = env_with_google("answer");

    let output = call(
        &env,
        "chat",
        json!({
            "prompt": "hello again",
            "model": "flash",
            "continuation_id": uuid::Uuid::new_v4().to_string(),
        }),
    )
    .await;

    assert_eq!(output.status, "continuation_available");
    assert!(output.continuation_id.is_some());

    let warnings = output.metadata["warnings"].as_array().unwrap();
    assert!(warnings[0].as_str().unwrap().contains("fresh thread"));
}

// Docgen refuses to finish while the counters disagree.
#[tokio::test]
async fn docgen_forces_continuation_until_counters_match() {
    let env = env_without_providers();

    let output = call(
        &env,
        "docgen",
        json!({
            "step": "documented two of five files",
            "step_number": 3,
            "total_steps": 3,
            "next_step_required": false,
            "findings": "progress",
            "num_files_documented": 2,
            "total_files_to_document": 5,
        }),
    )
    .await;

    assert_eq!(output.status, "documentation_incomplete");

    let payload = body(&output);
    assert_eq!(payload["next_step_required"], true);
    assert!(payload["next_steps"].as_str().unwrap().contains("2 of 5"));

    // Matching counters complete without a provider.
    let done = call(
        &env,
        "docgen",
        json!({
            "step": "documented everything",
            "step_number": 4,
            "total_steps": 4,
            "next_step_required": false,
            "findings": "all files documented",
            "num_files_documented": 5,
            "total_files_to_document": 5,
        }),
    )
    .await;

    assert_eq!(done.status, "documentation_analysis_complete");
}

// Restriction lists veto resolution with a message naming the list.
#[tokio::test]
async fn restriction_list_blocks_disallowed_models() {
    let config = Config::from_lookup(|key| match key {
        "GOOGLE_ALLOWED_MODELS" => Some("flash".to_string()),
        _ => None,
    });

    let mut registry = ProviderRegistry::empty(config.providers.clone());
    let (provider, _) = ScriptedProvider::new(ProviderKind::Google, "unused");
    registry.register(ProviderKind::Google, provider);
    let env = ToolEnv::new(config, registry);

    let output = call(&env, "chat", json!({"prompt": "x", "model": "pro"})).await;

    assert_eq!(output.status, "error");
    assert!(output.content.contains("GOOGLE_ALLOWED_MODELS"));

    let allowed = call(&env, "chat", json!({"prompt": "x", "model": "flash"})).await;
    assert_eq!(allowed.status, "success");
}

// Challenge is a pure transform even with providers present.
#[tokio::test]
async fn challenge_never_touches_the_provider() {
    let (env, calls) = env_with_google("unused");

    let output = call(&env, "challenge", json!({"prompt": "We should rewrite it in assembly"})).await;

    assert_eq!(output.status, "challenge_created");
    assert!(calls.lock().unwrap().is_empty());
}
