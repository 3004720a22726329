//! The dream tool triggers a full dream cycle on demand or from the
//! external scheduler.

use std::sync::Arc;

use anima_core::{Tool, ToolHandler, ToolInputSchema, ToolOutcome};
use serde_json::{json, Value};

use crate::dream::DreamPlanner;
use crate::identity::IdentityBuilder;
use crate::store::MindStore;

pub struct DreamTool {
    store: Arc<MindStore>,
    identity: Arc<IdentityBuilder>,
}

impl DreamTool {
    pub fn new(store: Arc<MindStore>, identity: Arc<IdentityBuilder>) -> Self {
        Self { store, identity }
    }
}

#[async_trait::async_trait]
impl ToolHandler for DreamTool {
    fn name(&self) -> &str {
        "mind_dream"
    }

    fn description(&self) -> &str {
        "Run the dream phase: decay learnings and build the self-analysis prompt"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Enter the dream phase. Applies relevance decay to approved learnings and returns an analysis prompt built from recent stress signals, confessions, refusals, guidance, and actions.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "days_to_analyze": {
                        "type": "integer",
                        "description": "How many days of signals to analyze, 1-30 (default 7)"
                    }
                }),
                &[],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let days = input.get("days_to_analyze").and_then(|v| v.as_i64()).unwrap_or(7);
        let outcome = DreamPlanner::dream(&self.store, days).await;

        // Decay changed relevances; the next prompt build must see them.
        self.identity.invalidate();

        ToolOutcome::ok(json!({
            "success": true,
            "message": format!(
                "Dream complete: {} signal(s) analyzed, {} learning(s) pruned.",
                outcome.log_count, outcome.pruned
            ),
            "log_count": outcome.log_count,
            "pruned": outcome.pruned,
            "analysis_prompt": outcome.prompt,
            "instruction": "Work through the analysis prompt above. For each tactical learning you decide to propose, call mind_save_learning with title, content, and rationale, then present the proposals to the user for approval.",
        }))
    }
}
