//! The multi-step workflow engine.
//!
//! Workflow tools follow one pattern: the agent posts a step with findings,
//! the engine consolidates state and forces a pause for real investigation,
//! and on the final step an expert model optionally validates the work. The
//! "pause" is modeled by returning control to the host; there is no
//! suspended task.

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexSet;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use conversation::{TokenBudget, TurnData, prepare_file_content};
use llm::{GenerationRequest, ToolCategory};

use crate::base::{self, CommonFields, Tool, ToolAnnotations, ToolError, validate_absolute_paths};
use crate::environment::ToolEnv;
use crate::output::ToolOutput;

fn default_true() -> bool {
    true
}

fn default_confidence() -> String {
    "low".to_string()
}

/// One step of a workflow tool invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRequest {
    pub step: String,
    pub step_number: usize,
    pub total_steps: usize,
    pub next_step_required: bool,
    #[serde(default)]
    pub findings: String,
    #[serde(default)]
    pub files_checked: Vec<String>,
    #[serde(default)]
    pub relevant_files: Vec<String>,
    #[serde(default)]
    pub relevant_context: Vec<String>,
    #[serde(default)]
    pub issues_found: Vec<Value>,
    #[serde(default = "default_confidence")]
    pub confidence: String,
    #[serde(default)]
    pub hypothesis: Option<String>,
    #[serde(default)]
    pub backtrack_from_step: Option<usize>,
    #[serde(default = "default_true")]
    pub use_assistant_model: bool,
    /// Docgen-style completion counters.
    #[serde(default)]
    pub num_files_documented: Option<usize>,
    #[serde(default)]
    pub total_files_to_document: Option<usize>,
    #[serde(flatten)]
    pub(crate) common: CommonFields,
    /// Tool-specific extras (trace mode, planner branching, …).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A hypothesis with the step that produced it.
#[derive(Debug, Clone)]
pub struct HypothesisEntry {
    pub step: usize,
    pub confidence: String,
    pub hypothesis: String,
}

/// Findings accumulated across all steps of one workflow invocation.
///
/// Mutated only by the engine; rebuilt by replay after a backtrack.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedFindings {
    pub files_checked: IndexSet<String>,
    pub relevant_files: IndexSet<String>,
    pub relevant_context: IndexSet<String>,
    pub findings: Vec<String>,
    pub hypotheses: Vec<HypothesisEntry>,
    pub issues_found: Vec<Value>,
    pub images: Vec<String>,
    pub confidence: String,
}

/// A completion override forcing another step (counter-driven tools).
pub struct ForcedContinuation {
    pub status: String,
    pub message: String,
}

/// What a workflow tool contributes on top of the shared engine.
pub trait WorkflowTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn system_prompt(&self) -> &'static str;

    fn category(&self) -> ToolCategory {
        ToolCategory::ExtendedReasoning
    }

    fn default_temperature(&self) -> f32 {
        0.2
    }

    /// Planner-style tools return false and never touch a provider.
    fn requires_model(&self) -> bool {
        true
    }

    /// Extra schema fields beyond the standard workflow set.
    fn tool_fields(&self) -> Map<String, Value> {
        Map::new()
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Investigation tasks the agent must perform before the next step.
    fn required_actions(&self, step_number: usize, confidence: &str, total_steps: usize) -> Vec<String>;

    /// Whether the final step warrants an external expert pass.
    fn should_call_expert(&self, findings: &ConsolidatedFindings) -> bool {
        !findings.relevant_files.is_empty() || findings.findings.len() >= 2 || !findings.issues_found.is_empty()
    }

    /// Whether terminal confidence skips the expert call entirely.
    fn skip_expert_on_certain_confidence(&self) -> bool {
        false
    }

    /// The confidence value treated as terminal certainty. Most tools use
    /// `certain`; refactor-style scales end at `complete`.
    fn certain_confidence_value(&self) -> &'static str {
        "certain"
    }

    /// Status for a completion that skipped the expert.
    fn completion_status(&self) -> &'static str {
        "high_confidence_completion"
    }

    /// Expert-analysis status when certainty short-circuited the call.
    fn certain_skip_status(&self) -> &'static str {
        "skipped_due_to_certain_confidence"
    }

    /// Expert-analysis status when the tool never consults an expert.
    fn skip_expert_status(&self) -> &'static str {
        "skipped_by_tool_design"
    }

    fn skip_expert_reason(&self) -> String {
        format!("{} completed with sufficient confidence", self.name())
    }

    fn completion_message(&self) -> String {
        format!(
            "{} complete with high confidence. Present the results to the user and proceed with \
             the identified solution without further consultation. Focus on the precise, \
             actionable steps.",
            capitalize(self.name())
        )
    }

    /// Instruction appended to the expert context.
    fn expert_instruction(&self) -> &'static str {
        "Please provide expert analysis of the investigation summarized above: validate the \
         findings, surface anything that was missed, and give concrete, actionable \
         recommendations."
    }

    /// Tool-specific sections added to the expert context.
    fn expert_context_sections(&self, _request: &WorkflowRequest) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Veto premature completion (docgen's file counters).
    fn completion_gate(&self, _request: &WorkflowRequest) -> Option<ForcedContinuation> {
        None
    }

    /// Intercept a request before step processing (tracer mode selection).
    fn preprocess(&self, _env: &ToolEnv, _request: &WorkflowRequest) -> Option<ToolOutput> {
        None
    }

    /// Rename generic statuses and keys to tool-specific ones.
    fn customize_response(&self, _response: &mut Map<String, Value>) {}
}

/// Snapshot of one posted step, kept for replay after backtracks.
#[derive(Debug, Clone)]
struct StepRecord {
    step: String,
    step_number: usize,
    findings: String,
    files_checked: Vec<String>,
    relevant_files: Vec<String>,
    relevant_context: Vec<String>,
    issues_found: Vec<Value>,
    confidence: String,
    hypothesis: Option<String>,
    images: Vec<String>,
}

impl StepRecord {
    fn from_request(request: &WorkflowRequest) -> Self {
        Self {
            step: request.step.clone(),
            step_number: request.step_number,
            findings: request.findings.clone(),
            files_checked: request.files_checked.clone(),
            relevant_files: request.relevant_files.clone(),
            relevant_context: request.relevant_context.clone(),
            issues_found: request.issues_found.clone(),
            confidence: request.confidence.clone(),
            hypothesis: request.hypothesis.clone(),
            images: request.common.images.clone(),
        }
    }
}

/// Replay step records into consolidated findings.
///
/// Keeping this a pure function makes backtracking trivially correct: the
/// state after a backtrack is exactly the replay of the surviving records.
fn consolidate(records: &[StepRecord]) -> ConsolidatedFindings {
    let mut findings = ConsolidatedFindings {
        confidence: "low".to_string(),
        ..Default::default()
    };

    for record in records {
        findings.files_checked.extend(record.files_checked.iter().cloned());
        findings.relevant_files.extend(record.relevant_files.iter().cloned());
        findings.relevant_context.extend(record.relevant_context.iter().cloned());

        if !record.findings.is_empty() {
            findings.findings.push(format!("Step {}: {}", record.step_number, record.findings));
        }

        if let Some(hypothesis) = &record.hypothesis {
            findings.hypotheses.push(HypothesisEntry {
                step: record.step_number,
                confidence: record.confidence.clone(),
                hypothesis: hypothesis.clone(),
            });
        }

        findings.issues_found.extend(record.issues_found.iter().cloned());

        for image in &record.images {
            if !findings.images.contains(image) {
                findings.images.push(image.clone());
            }
        }

        findings.confidence = record.confidence.clone();
    }

    findings
}

/// Adapts a [`WorkflowTool`] to the dispatchable [`Tool`] contract and owns
/// the per-thread step history.
pub struct WorkflowRunner<T> {
    tool: T,
    state: DashMap<Uuid, Vec<StepRecord>>,
}

impl<T: WorkflowTool> WorkflowRunner<T> {
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            state: DashMap::new(),
        }
    }
}

#[async_trait]
impl<T: WorkflowTool> Tool for WorkflowRunner<T> {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    fn description(&self) -> &'static str {
        self.tool.description()
    }

    fn category(&self) -> ToolCategory {
        self.tool.category()
    }

    fn requires_model(&self) -> bool {
        self.tool.requires_model()
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations { read_only: true }
    }

    fn input_schema(&self, env: &ToolEnv) -> Value {
        crate::schema::build_workflow_schema(
            env,
            self.tool.tool_fields(),
            self.tool.required_fields(),
            self.tool.requires_model(),
        )
    }

    async fn execute(&self, env: &ToolEnv, arguments: Value) -> ToolOutput {
        match self.run(env, arguments).await {
            Ok(output) => output,
            Err(error) => error.into(),
        }
    }
}

impl<T: WorkflowTool> WorkflowRunner<T> {
    async fn run(&self, env: &ToolEnv, arguments: Value) -> Result<ToolOutput, ToolError> {
        validate_absolute_paths(&arguments)?;

        let mut request: WorkflowRequest = serde_json::from_value(arguments)
            .map_err(|e| ToolError::Validation(format!("Invalid request for '{}': {e}", self.tool.name())))?;

        if request.step_number < 1 {
            return Err(ToolError::Validation("step_number starts at 1".to_string()));
        }

        if let Some(intercepted) = self.tool.preprocess(env, &request) {
            return Ok(intercepted);
        }

        // The engine tolerates an agent that discovers mid-flight that the
        // work is bigger than estimated.
        if request.step_number > request.total_steps {
            request.total_steps = request.step_number;
        }

        let mut continuation_warning = None;

        let thread_id = match &request.common.continuation_id {
            Some(raw_id) => {
                let id = Uuid::parse_str(raw_id)
                    .map_err(|_| ToolError::Validation(format!("Invalid continuation_id: '{raw_id}'")))?;

                if env.store.get_thread(id).is_some() {
                    id
                } else {
                    log::warn!("Workflow continuation {id} expired or unknown, starting a fresh thread");
                    continuation_warning =
                        Some("continuation_id was expired or unknown; a fresh thread was created".to_string());
                    self.fresh_thread(env, &request)
                }
            }
            None => self.fresh_thread(env, &request),
        };

        // Snapshot, mutate, and write back without holding a map guard
        // across the expert-analysis await below.
        let mut records = self
            .state
            .get(&thread_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        if let Some(backtrack_from) = request.backtrack_from_step {
            log::debug!(
                "{}: backtracking thread {thread_id} to before step {backtrack_from}",
                self.tool.name()
            );
            records.retain(|record| record.step_number < backtrack_from);
        }

        records.push(StepRecord::from_request(&request));
        self.state.insert(thread_id, records.clone());

        let findings = consolidate(&records);

        let mut response = self.base_response(&request, &findings, thread_id);

        if let Some(warning) = continuation_warning {
            push_metadata_warning(&mut response, warning);
        }

        let output = if request.next_step_required {
            self.paused_response(&request, response)
        } else if let Some(forced) = self.tool.completion_gate(&request) {
            self.forced_continuation_response(&request, response, forced)
        } else {
            self.final_response(env, &request, &records, &findings, response).await?
        };

        // Turns land only once the step fully resolved; a cancelled provider
        // call leaves the thread untouched.
        env.store.add_turn(
            thread_id,
            conversation::Role::User,
            TurnData {
                content: request.step.clone(),
                files: request.relevant_files.clone(),
                images: request.common.images.clone(),
                tool_name: Some(self.tool.name().to_string()),
                model_metadata: step_metadata(&request),
                ..Default::default()
            },
        );
        self.record_assistant_turn(env, thread_id, &output);

        Ok(output)
    }

    fn fresh_thread(&self, env: &ToolEnv, request: &WorkflowRequest) -> Uuid {
        let mut initial_context = serde_json::Map::new();
        initial_context.insert("initial_step".to_string(), request.step.clone().into());
        initial_context.insert("total_steps".to_string(), request.total_steps.into());

        env.store.create_thread(self.tool.name(), initial_context, None)
    }

    fn base_response(
        &self,
        request: &WorkflowRequest,
        findings: &ConsolidatedFindings,
        thread_id: Uuid,
    ) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("step_number".to_string(), request.step_number.into());
        map.insert("total_steps".to_string(), request.total_steps.into());
        map.insert("next_step_required".to_string(), request.next_step_required.into());
        map.insert("continuation_id".to_string(), thread_id.to_string().into());
        map.insert(
            format!("{}_status", self.tool.name()),
            json!({
                "files_checked": findings.files_checked.len(),
                "relevant_files": findings.relevant_files.len(),
                "relevant_context": findings.relevant_context.len(),
                "issues_found": findings.issues_found.len(),
                "images_collected": findings.images.len(),
                "hypotheses_formed": findings.hypotheses.len(),
                "current_confidence": findings.confidence,
            }),
        );
        map.insert("metadata".to_string(), json!({ "tool_name": self.tool.name() }));

        map
    }

    fn paused_response(&self, request: &WorkflowRequest, mut response: Map<String, Value>) -> ToolOutput {
        let name = self.tool.name();
        let actions = self
            .tool
            .required_actions(request.step_number, &request.confidence, request.total_steps);

        response.insert("status".to_string(), format!("pause_for_{name}").into());
        response.insert("required_actions".to_string(), actions.into());
        response.insert(
            "next_steps".to_string(),
            format!(
                "MANDATORY: DO NOT call the {name} tool again immediately. You MUST first complete \
                 the required investigation actions: examine the code, gather evidence, and record \
                 concrete findings. Only call {name} again AFTER completing that work, reporting \
                 what you found in the 'findings' parameter."
            )
            .into(),
        );

        self.finish(response)
    }

    fn forced_continuation_response(
        &self,
        _request: &WorkflowRequest,
        mut response: Map<String, Value>,
        forced: ForcedContinuation,
    ) -> ToolOutput {
        response.insert("status".to_string(), forced.status.into());
        response.insert("next_step_required".to_string(), true.into());
        response.insert("next_steps".to_string(), forced.message.into());

        self.finish(response)
    }

    async fn final_response(
        &self,
        env: &ToolEnv,
        request: &WorkflowRequest,
        records: &[StepRecord],
        findings: &ConsolidatedFindings,
        mut response: Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let name = self.tool.name();

        let certain_skip = self.tool.skip_expert_on_certain_confidence()
            && request
                .confidence
                .eq_ignore_ascii_case(self.tool.certain_confidence_value());
        let caller_skip = !request.use_assistant_model;
        let design_skip = !self.tool.requires_model() || !self.tool.should_call_expert(findings);

        if certain_skip || caller_skip || design_skip {
            let (skip_status, reason) = if certain_skip {
                (
                    self.tool.certain_skip_status(),
                    format!("{name} completed with certain confidence; external validation unnecessary"),
                )
            } else if caller_skip {
                ("skipped_by_user_request", "expert analysis disabled by the caller".to_string())
            } else {
                (self.tool.skip_expert_status(), self.tool.skip_expert_reason())
            };

            response.insert("status".to_string(), self.tool.completion_status().into());
            response.insert(
                format!("complete_{name}"),
                self.completion_data(request, records, findings),
            );
            response.insert("next_steps".to_string(), self.tool.completion_message().into());
            response.insert("skip_expert_analysis".to_string(), true.into());
            response.insert(
                "expert_analysis".to_string(),
                json!({ "status": skip_status, "reason": reason }),
            );

            return Ok(self.finish(response));
        }

        let expert = self.call_expert(env, request, records, findings).await?;

        response.insert("status".to_string(), "calling_expert_analysis".to_string().into());
        response.insert(
            format!("complete_{name}"),
            self.completion_data(request, records, findings),
        );
        response.insert("expert_analysis".to_string(), expert.analysis);
        response.insert(
            "next_steps".to_string(),
            format!(
                "{} is complete. Present the expert analysis alongside your own findings, \
                 reconciling any disagreements, and give the user clear, actionable \
                 recommendations.",
                capitalize(name)
            )
            .into(),
        );

        if let Some(metadata) = response.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert("model_name".to_string(), expert.model_name.into());
            metadata.insert("provider".to_string(), expert.provider.into());
        }

        Ok(self.finish(response))
    }

    fn completion_data(
        &self,
        request: &WorkflowRequest,
        records: &[StepRecord],
        findings: &ConsolidatedFindings,
    ) -> Value {
        let initial_request = records.first().map(|r| r.step.clone()).unwrap_or_default();

        json!({
            "initial_request": initial_request,
            "steps_taken": records.len(),
            "files_examined": findings.files_checked.iter().collect::<Vec<_>>(),
            "relevant_files": findings.relevant_files.iter().collect::<Vec<_>>(),
            "relevant_context": findings.relevant_context.iter().collect::<Vec<_>>(),
            "work_summary": format!(
                "Completed {} work step(s); examined {} file(s), {} identified as relevant.",
                records.len(),
                findings.files_checked.len(),
                findings.relevant_files.len()
            ),
            "final_analysis": request.hypothesis,
            "confidence_level": request.confidence,
        })
    }

    async fn call_expert(
        &self,
        env: &ToolEnv,
        request: &WorkflowRequest,
        records: &[StepRecord],
        findings: &ConsolidatedFindings,
    ) -> Result<ExpertResult, ToolError> {
        let resolution = base::resolve_model(env, request.common.model.as_deref())?;
        let capability = resolution.capability.clone();

        let budget = TokenBudget::for_model(&capability);
        let mut context = self.expert_context(request, records, findings);

        let relevant: Vec<String> = findings.relevant_files.iter().cloned().collect();
        if !relevant.is_empty() {
            let prepared = prepare_file_content(&env.store, None, &relevant, budget.files, "ESSENTIAL FILES")?;
            if !prepared.content.is_empty() {
                context.push_str("\n\n");
                context.push_str(&prepared.content);
            }
        }

        context.push_str("\n\n");
        context.push_str(self.tool.expert_instruction());

        let (temperature, _) =
            base::validate_temperature(request.common.temperature, self.tool.default_temperature(), &capability);
        let (thinking_mode, _) = base::validate_thinking_mode(request.common.thinking_mode.as_deref(), &capability);

        // Images collected during investigation ride along when the expert
        // model can see them; otherwise they are dropped quietly.
        let images = if base::validate_images(&findings.images, &capability).is_ok() {
            findings.images.clone()
        } else {
            log::warn!("Dropping {} investigation image(s): unsupported by '{}'", findings.images.len(), capability.name);
            Vec::new()
        };

        let generation = GenerationRequest {
            prompt: context,
            model: capability.name.clone(),
            system_prompt: Some(format!("{}{}", self.tool.system_prompt(), base::locale_instruction(env))),
            temperature,
            max_output_tokens: None,
            thinking_mode,
            images,
            json_schema: None,
        };

        let model_response = resolution.provider.generate(generation).await?;

        // Expert replies are frequently structured JSON already; pass them
        // through intact when they parse.
        let analysis = match serde_json::from_str::<Value>(&model_response.content) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => json!({
                "status": "analysis_complete",
                "raw_analysis": model_response.content,
            }),
        };

        Ok(ExpertResult {
            analysis,
            model_name: model_response.model_name,
            provider: model_response.provider.as_str().to_string(),
        })
    }

    fn expert_context(
        &self,
        request: &WorkflowRequest,
        records: &[StepRecord],
        findings: &ConsolidatedFindings,
    ) -> String {
        let initial = records.first().map(|r| r.step.as_str()).unwrap_or_default();

        let mut parts = vec![format!("=== ISSUE DESCRIPTION ===\n{initial}\n=== END DESCRIPTION ===")];

        if !findings.findings.is_empty() {
            parts.push(format!(
                "\n=== INVESTIGATION FINDINGS ===\n{}\n=== END FINDINGS ===",
                findings.findings.join("\n")
            ));
        }

        if !findings.relevant_context.is_empty() {
            let methods = findings
                .relevant_context
                .iter()
                .map(|method| format!("- {method}"))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("\n=== RELEVANT METHODS/FUNCTIONS ===\n{methods}\n=== END METHODS ==="));
        }

        if !findings.hypotheses.is_empty() {
            let hypotheses = findings
                .hypotheses
                .iter()
                .map(|entry| {
                    format!(
                        "Step {} ({} confidence): {}",
                        entry.step, entry.confidence, entry.hypothesis
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("\n=== HYPOTHESIS EVOLUTION ===\n{hypotheses}\n=== END HYPOTHESES ==="));
        }

        if !findings.issues_found.is_empty() {
            let issues = findings
                .issues_found
                .iter()
                .map(|issue| {
                    let severity = issue
                        .get("severity")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_uppercase();
                    let description = issue
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("No description");
                    format!("[{severity}] {description}")
                })
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("\n=== ISSUES IDENTIFIED ===\n{issues}\n=== END ISSUES ==="));
        }

        for (title, content) in self.tool.expert_context_sections(request) {
            let upper = title.to_uppercase();
            parts.push(format!("\n=== {upper} ===\n{content}\n=== END {upper} ==="));
        }

        parts.join("\n")
    }

    fn record_assistant_turn(&self, env: &ToolEnv, thread_id: Uuid, output: &ToolOutput) {
        let mut metadata = serde_json::Map::new();
        metadata.insert("status".to_string(), output.status.clone().into());

        env.store.add_turn(
            thread_id,
            conversation::Role::Assistant,
            TurnData {
                content: output.content.clone(),
                tool_name: Some(self.tool.name().to_string()),
                model_metadata: metadata,
                ..Default::default()
            },
        );
    }

    fn finish(&self, mut response: Map<String, Value>) -> ToolOutput {
        self.tool.customize_response(&mut response);

        let status = response
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("success")
            .to_string();

        let continuation = response
            .get("continuation_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut output = ToolOutput::json(status, &Value::Object(response));
        output.continuation_id = continuation;
        output
    }
}

struct ExpertResult {
    analysis: Value,
    model_name: String,
    provider: String,
}

fn step_metadata(request: &WorkflowRequest) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("step_number".to_string(), request.step_number.into());
    metadata.insert("confidence".to_string(), request.confidence.clone().into());
    metadata
}

fn push_metadata_warning(response: &mut Map<String, Value>, warning: String) {
    if let Some(metadata) = response.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.insert("warnings".to_string(), json!([warning]));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InvestigateTool;

    impl WorkflowTool for InvestigateTool {
        fn name(&self) -> &'static str {
            "investigate"
        }

        fn description(&self) -> &'static str {
            "test workflow tool"
        }

        fn system_prompt(&self) -> &'static str {
            "system"
        }

        fn required_actions(&self, step_number: usize, _confidence: &str, _total_steps: usize) -> Vec<String> {
            vec![format!("look harder (step {step_number})")]
        }

        fn skip_expert_on_certain_confidence(&self) -> bool {
            true
        }

        fn completion_status(&self) -> &'static str {
            "certain_confidence_proceed_with_fix"
        }
    }

    fn env() -> ToolEnv {
        let config = config::Config::default();
        let registry = llm::ProviderRegistry::empty(config.providers.clone());
        ToolEnv::new(config, registry)
    }

    fn step(step_number: usize, total: usize, next_required: bool) -> Value {
        json!({
            "step": format!("step {step_number}"),
            "step_number": step_number,
            "total_steps": total,
            "next_step_required": next_required,
            "findings": format!("finding {step_number}"),
        })
    }

    fn parsed(output: &ToolOutput) -> Map<String, Value> {
        serde_json::from_str::<Value>(&output.content)
            .unwrap()
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn first_step_pauses_with_required_actions() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let output = runner.execute(&env(), step(1, 3, true)).await;

        assert_eq!(output.status, "pause_for_investigate");
        let body = parsed(&output);

        assert_eq!(body["step_number"], 1);
        assert!(body["required_actions"].as_array().unwrap()[0]
            .as_str()
            .unwrap()
            .contains("step 1"));
        assert!(body["next_steps"].as_str().unwrap().contains("DO NOT call"));
        assert!(output.continuation_id.is_some());
    }

    #[tokio::test]
    async fn steps_consolidate_across_continuation() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let env = env();

        let first = runner.execute(&env, step(1, 3, true)).await;
        let continuation = first.continuation_id.clone().unwrap();

        let mut second = step(2, 3, true);
        second["continuation_id"] = continuation.clone().into();
        second["files_checked"] = json!(["/src/a.rs"]);
        let output = runner.execute(&env, second).await;

        let body = parsed(&output);
        assert_eq!(body["continuation_id"].as_str().unwrap(), continuation);
        assert_eq!(body["investigate_status"]["files_checked"], 1);

        // A repeated file does not double-count.
        let mut third = step(3, 3, true);
        third["continuation_id"] = continuation.into();
        third["files_checked"] = json!(["/src/a.rs"]);
        let output = runner.execute(&env, third).await;
        assert_eq!(parsed(&output)["investigate_status"]["files_checked"], 1);
    }

    #[tokio::test]
    async fn step_number_beyond_total_bumps_total() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let output = runner.execute(&env(), step(5, 3, true)).await;

        let body = parsed(&output);
        assert_eq!(body["total_steps"], 5);
        assert_eq!(body["step_number"], 5);
    }

    #[tokio::test]
    async fn backtrack_replays_surviving_steps() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let env = env();

        let first = runner.execute(&env, step(1, 4, true)).await;
        let continuation = first.continuation_id.clone().unwrap();

        let mut second = step(2, 4, true);
        second["continuation_id"] = continuation.clone().into();
        second["files_checked"] = json!(["/wrong/path.rs"]);
        second["hypothesis"] = "wrong theory".into();
        runner.execute(&env, second).await;

        // Backtrack to before step 2; the wrong-path evidence must vanish.
        let mut revised = step(2, 4, true);
        revised["continuation_id"] = continuation.into();
        revised["backtrack_from_step"] = 2.into();
        revised["files_checked"] = json!(["/right/path.rs"]);
        let output = runner.execute(&env, revised).await;

        let body = parsed(&output);
        assert_eq!(body["investigate_status"]["files_checked"], 1);
        assert_eq!(body["investigate_status"]["hypotheses_formed"], 0);
    }

    #[tokio::test]
    async fn certain_confidence_skips_the_expert() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let env = env();

        let first = runner.execute(&env, step(1, 2, true)).await;
        let continuation = first.continuation_id.clone().unwrap();

        let mut last = step(2, 2, false);
        last["continuation_id"] = continuation.into();
        last["confidence"] = "certain".into();
        last["hypothesis"] = "Missing import of the hashing module".into();
        let output = runner.execute(&env, last).await;

        assert_eq!(output.status, "certain_confidence_proceed_with_fix");
        let body = parsed(&output);

        assert_eq!(body["expert_analysis"]["status"], "skipped_due_to_certain_confidence");
        assert_eq!(body["complete_investigate"]["confidence_level"], "certain");
        assert_eq!(
            body["complete_investigate"]["final_analysis"],
            "Missing import of the hashing module"
        );
    }

    #[tokio::test]
    async fn caller_opt_out_skips_the_expert() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let env = env();

        let mut only = step(1, 1, false);
        only["use_assistant_model"] = false.into();
        only["relevant_files"] = json!(["/src/lib.rs"]);
        let output = runner.execute(&env, only).await;

        let body = parsed(&output);
        assert_eq!(body["expert_analysis"]["status"], "skipped_by_user_request");
        assert_eq!(body["skip_expert_analysis"], true);
    }

    #[tokio::test]
    async fn stale_continuation_warns_and_starts_fresh() {
        let runner = WorkflowRunner::new(InvestigateTool);
        let env = env();

        let mut request = step(1, 2, true);
        request["continuation_id"] = Uuid::new_v4().to_string().into();
        let output = runner.execute(&env, request).await;

        let body = parsed(&output);
        let warnings = body["metadata"]["warnings"].as_array().unwrap();
        assert!(warnings[0].as_str().unwrap().contains("fresh thread"));

        // The fresh thread id is offered for the next step.
        assert!(output.continuation_id.is_some());
    }

    #[tokio::test]
    async fn relative_paths_fail_before_any_processing() {
        let runner = WorkflowRunner::new(InvestigateTool);

        let mut request = step(1, 1, true);
        request["files_checked"] = json!(["relative/path.rs"]);
        let output = runner.execute(&env(), request).await;

        assert!(output.is_error());
        assert!(output.content.contains("must be absolute"));
    }

    #[test]
    fn consolidation_is_a_pure_replay() {
        let records = vec![
            StepRecord {
                step: "s1".into(),
                step_number: 1,
                findings: "f1".into(),
                files_checked: vec!["/a.rs".into()],
                relevant_files: vec![],
                relevant_context: vec!["mod::func".into()],
                issues_found: vec![json!({"severity": "high", "description": "bug"})],
                confidence: "low".into(),
                hypothesis: None,
                images: vec!["/img.png".into()],
            },
            StepRecord {
                step: "s2".into(),
                step_number: 2,
                findings: "f2".into(),
                files_checked: vec!["/a.rs".into(), "/b.rs".into()],
                relevant_files: vec!["/b.rs".into()],
                relevant_context: vec![],
                issues_found: vec![],
                confidence: "high".into(),
                hypothesis: Some("theory".into()),
                images: vec!["/img.png".into()],
            },
        ];

        let findings = consolidate(&records);

        assert_eq!(findings.files_checked.len(), 2);
        assert_eq!(findings.relevant_files.len(), 1);
        assert_eq!(findings.findings, vec!["Step 1: f1", "Step 2: f2"]);
        assert_eq!(findings.hypotheses.len(), 1);
        assert_eq!(findings.issues_found.len(), 1);
        assert_eq!(findings.images.len(), 1);
        assert_eq!(findings.confidence, "high");
    }
}
