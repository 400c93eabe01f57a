//! The process-wide tool registry.

use crate::analyze::AnalyzeTool;
use crate::base::Tool;
use crate::challenge::ChallengeTool;
use crate::chat::ChatTool;
use crate::codereview::CodeReviewTool;
use crate::consensus::ConsensusTool;
use crate::debug::DebugTool;
use crate::docgen::DocgenTool;
use crate::planner::PlannerTool;
use crate::precommit::PrecommitTool;
use crate::refactor::RefactorTool;
use crate::secaudit::SecauditTool;
use crate::simple::SimpleRunner;
use crate::testgen::TestGenTool;
use crate::thinkdeep::ThinkDeepTool;
use crate::tracer::TracerTool;
use crate::workflow::WorkflowRunner;

/// Holds every registered tool; the MCP shell lists and dispatches through
/// this.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The full tool set served by a default deployment.
    pub fn with_default_tools() -> Self {
        let tools: Vec<Box<dyn Tool>> = vec![
            Box::new(SimpleRunner::new(ChatTool)),
            Box::new(WorkflowRunner::new(ThinkDeepTool)),
            Box::new(WorkflowRunner::new(PlannerTool)),
            Box::new(ConsensusTool),
            Box::new(WorkflowRunner::new(CodeReviewTool)),
            Box::new(WorkflowRunner::new(PrecommitTool)),
            Box::new(WorkflowRunner::new(DebugTool)),
            Box::new(WorkflowRunner::new(SecauditTool)),
            Box::new(WorkflowRunner::new(DocgenTool)),
            Box::new(WorkflowRunner::new(AnalyzeTool)),
            Box::new(WorkflowRunner::new(RefactorTool)),
            Box::new(WorkflowRunner::new(TracerTool)),
            Box::new(WorkflowRunner::new(TestGenTool)),
            Box::new(ChallengeTool),
        ];

        Self { tools }
    }

    /// An empty registry for tests that register their own tools.
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        if self.get(tool.name()).is_some() {
            log::warn!("Tool '{}' is already registered, skipping duplicate", tool.name());
            return;
        }

        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|tool| tool.name() == name).map(|t| t.as_ref())
    }

    pub fn tools(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }
}
