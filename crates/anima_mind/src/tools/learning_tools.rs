//! Learning lifecycle tools: list, save, approve, reject.
//!
//! Approval is the user's explicit gate: the engine never promotes a
//! proposal on its own.

use std::sync::Arc;

use anima_core::{Tool, ToolHandler, ToolInputSchema, ToolOutcome};
use serde_json::{json, Value};

use crate::identity::IdentityBuilder;
use crate::store::{Learning, MindStore};

fn required_id(input: &Value) -> Result<i64, ToolOutcome> {
    input
        .get("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ToolOutcome::permanent_error("Missing required parameter: \"id\" (integer)"))
}

fn format_approved(l: &Learning) -> String {
    format!(
        "#{} (relevance {:.2}, activated {}x) {}: {}",
        l.id, l.relevance_score, l.activation_count, l.title, l.content
    )
}

fn format_pending(l: &Learning) -> String {
    format!("#{} {}: {} — {}", l.id, l.title, l.content, l.rationale)
}

// ============================================================================
// mind_get_learnings
// ============================================================================

pub struct GetLearningsTool {
    store: Arc<MindStore>,
}

impl GetLearningsTool {
    pub fn new(store: Arc<MindStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ToolHandler for GetLearningsTool {
    fn name(&self) -> &str {
        "mind_get_learnings"
    }

    fn description(&self) -> &str {
        "List approved and pending tactical learnings"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Show all tactical learnings: approved ones (active in your prompt) and pending proposals awaiting user decision.".to_string(),
            input_schema: ToolInputSchema::object(json!({}), &[]),
        }
    }

    async fn execute(&self, _input: &Value) -> ToolOutcome {
        let approved: Vec<String> = self
            .store
            .get_approved_learnings()
            .await
            .iter()
            .map(format_approved)
            .collect();
        let pending: Vec<String> = self
            .store
            .get_pending_learnings()
            .await
            .iter()
            .map(format_pending)
            .collect();

        ToolOutcome::ok(json!({
            "success": true,
            "message": format!("{} approved, {} pending.", approved.len(), pending.len()),
            "approved": approved,
            "pending": pending,
        }))
    }
}

// ============================================================================
// mind_save_learning
// ============================================================================

pub struct SaveLearningTool {
    store: Arc<MindStore>,
    identity: Arc<IdentityBuilder>,
}

impl SaveLearningTool {
    pub fn new(store: Arc<MindStore>, identity: Arc<IdentityBuilder>) -> Self {
        Self { store, identity }
    }
}

#[async_trait::async_trait]
impl ToolHandler for SaveLearningTool {
    fn name(&self) -> &str {
        "mind_save_learning"
    }

    fn description(&self) -> &str {
        "Save a proposed tactical learning for user approval"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Save a tactical learning proposal (pending until the user approves it). Content should be 50 words or fewer.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "title": { "type": "string", "description": "Short memorable name" },
                    "content": { "type": "string", "description": "The behavioral rule itself, max ~50 words" },
                    "rationale": { "type": "string", "description": "Which logged pattern motivated it" }
                }),
                &["title", "content", "rationale"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let mut fields = Vec::with_capacity(3);
        for key in ["title", "content", "rationale"] {
            match input.get(key).and_then(|v| v.as_str()).filter(|s| !s.trim().is_empty()) {
                Some(s) => fields.push(s),
                None => {
                    return ToolOutcome::permanent_error(format!(
                        "Missing required parameter: \"{}\"",
                        key
                    ))
                }
            }
        }

        let id = self.store.add_learning(fields[0], fields[1], fields[2], false).await;
        self.identity.invalidate();

        ToolOutcome::ok(json!({
            "success": true,
            "message": format!("Learning proposal #{} saved. Awaiting user approval.", id),
            "id": id,
        }))
    }
}

// ============================================================================
// mind_approve_learning
// ============================================================================

pub struct ApproveLearningTool {
    store: Arc<MindStore>,
    identity: Arc<IdentityBuilder>,
}

impl ApproveLearningTool {
    pub fn new(store: Arc<MindStore>, identity: Arc<IdentityBuilder>) -> Self {
        Self { store, identity }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ApproveLearningTool {
    fn name(&self) -> &str {
        "mind_approve_learning"
    }

    fn description(&self) -> &str {
        "Approve a pending learning (user decision)"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Approve a pending learning by id. Only call this when the user explicitly approved it.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({ "id": { "type": "integer", "description": "Learning id" } }),
                &["id"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let id = match required_id(input) {
            Ok(id) => id,
            Err(out) => return out,
        };

        if self.store.approve_learning(id).await {
            self.identity.invalidate();
            ToolOutcome::ok(json!({
                "success": true,
                "message": format!("Learning #{} approved. It is now part of your identity.", id),
            }))
        } else {
            ToolOutcome::ok(json!({
                "success": false,
                "message": format!("Learning #{} not found.", id),
            }))
        }
    }
}

// ============================================================================
// mind_reject_learning
// ============================================================================

pub struct RejectLearningTool {
    store: Arc<MindStore>,
    identity: Arc<IdentityBuilder>,
}

impl RejectLearningTool {
    pub fn new(store: Arc<MindStore>, identity: Arc<IdentityBuilder>) -> Self {
        Self { store, identity }
    }
}

#[async_trait::async_trait]
impl ToolHandler for RejectLearningTool {
    fn name(&self) -> &str {
        "mind_reject_learning"
    }

    fn description(&self) -> &str {
        "Reject a learning (user decision); it will not be re-proposed"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Reject a learning by id. A tombstone is kept so future dream phases do not re-propose it.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({ "id": { "type": "integer", "description": "Learning id" } }),
                &["id"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let id = match required_id(input) {
            Ok(id) => id,
            Err(out) => return out,
        };

        if self.store.reject_learning(id).await {
            self.identity.invalidate();
            ToolOutcome::ok(json!({
                "success": true,
                "message": format!("Learning #{} rejected and remembered as rejected.", id),
            }))
        } else {
            ToolOutcome::ok(json!({
                "success": false,
                "message": format!("Learning #{} not found.", id),
            }))
        }
    }
}
