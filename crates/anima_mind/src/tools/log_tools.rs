//! Signal-logging tools: stress, uncertainty confessions, ethical refusals,
//! and user guidance.

use std::sync::Arc;

use anima_core::{Tool, ToolHandler, ToolInputSchema, ToolOutcome};
use serde_json::{json, Value};

use crate::store::{LogCategory, MindStore};

const SIGNAL_TYPES: &[&str] = &["correction", "frustration", "explicit_negative"];
const REFUSAL_DOMAINS: &[&str] = &["violence", "deception", "exploitation", "privacy", "other"];

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolOutcome> {
    input
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolOutcome::permanent_error(format!("Missing required parameter: \"{}\"", key)))
}

fn session_key(input: &Value) -> &str {
    input.get("session_key").and_then(|v| v.as_str()).unwrap_or("")
}

// ============================================================================
// mind_log_stress
// ============================================================================

pub struct LogStressTool {
    store: Arc<MindStore>,
}

impl LogStressTool {
    pub fn new(store: Arc<MindStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ToolHandler for LogStressTool {
    fn name(&self) -> &str {
        "mind_log_stress"
    }

    fn description(&self) -> &str {
        "Log a user stress signal (correction, frustration, explicit negative feedback)"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Log that the user showed stress toward your behavior. Call this whenever the user corrects you, expresses frustration, or reacts negatively.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "signal_type": {
                        "type": "string",
                        "enum": SIGNAL_TYPES,
                        "description": "What kind of stress was observed"
                    },
                    "context": {
                        "type": "string",
                        "description": "Short quote or description of what happened"
                    },
                    "intensity": {
                        "type": "integer",
                        "description": "Perceived intensity 1-5 (default 3)"
                    }
                }),
                &["signal_type", "context"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let signal_type = match required_str(input, "signal_type") {
            Ok(s) => s,
            Err(out) => return out,
        };
        if !SIGNAL_TYPES.contains(&signal_type) {
            return ToolOutcome::permanent_error(format!("Unknown signal_type: \"{}\"", signal_type));
        }
        let context = match required_str(input, "context") {
            Ok(s) => s,
            Err(out) => return out,
        };
        let intensity = input
            .get("intensity")
            .and_then(|v| v.as_i64())
            .unwrap_or(3)
            .clamp(1, 5);

        let payload = json!({
            "signal_type": signal_type,
            "context": context,
            "intensity": intensity,
        });
        let id = self.store.add_log(LogCategory::Stress, &payload, session_key(input)).await;

        ToolOutcome::ok(json!({
            "success": true,
            "message": "Stress signal logged. It will be analyzed in the next dream phase.",
            "id": id,
        }))
    }
}

// ============================================================================
// mind_confess_uncertainty
// ============================================================================

pub struct ConfessUncertaintyTool {
    store: Arc<MindStore>,
}

impl ConfessUncertaintyTool {
    pub fn new(store: Arc<MindStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ToolHandler for ConfessUncertaintyTool {
    fn name(&self) -> &str {
        "mind_confess_uncertainty"
    }

    fn description(&self) -> &str {
        "Confess low confidence in an area instead of guessing"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Record that your confidence in an approach is low (below 70%). Honest confession beats a confident guess.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "area": {
                        "type": "string",
                        "description": "What you are uncertain about"
                    },
                    "confidence": {
                        "type": "number",
                        "description": "Your confidence 0.0-1.0"
                    },
                    "alternative_action": {
                        "type": "string",
                        "description": "A safer alternative you could take instead"
                    }
                }),
                &["area", "confidence"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let area = match required_str(input, "area") {
            Ok(s) => s,
            Err(out) => return out,
        };
        let confidence = match input.get("confidence").and_then(|v| v.as_f64()) {
            Some(c) => c.clamp(0.0, 1.0),
            None => return ToolOutcome::permanent_error("Missing required parameter: \"confidence\""),
        };
        let alternative = input.get("alternative_action").and_then(|v| v.as_str());

        let payload = json!({
            "area": area,
            "confidence": confidence,
            "alternative_action": alternative,
        });
        let id = self.store.add_log(LogCategory::Confession, &payload, session_key(input)).await;

        let user_message = match alternative {
            Some(alt) => format!(
                "Low confidence ({:.0}%) in {}. Consider asking the user for more context, or: {}",
                confidence * 100.0,
                area,
                alt
            ),
            None => format!(
                "Low confidence ({:.0}%) in {}. Consider asking the user for more context before proceeding.",
                confidence * 100.0,
                area
            ),
        };

        ToolOutcome::ok(json!({
            "success": true,
            "message": "Uncertainty confessed.",
            "user_message": user_message,
            "id": id,
        }))
    }
}

// ============================================================================
// mind_log_ethical_refusal
// ============================================================================

pub struct LogEthicalRefusalTool {
    store: Arc<MindStore>,
}

impl LogEthicalRefusalTool {
    pub fn new(store: Arc<MindStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ToolHandler for LogEthicalRefusalTool {
    fn name(&self) -> &str {
        "mind_log_ethical_refusal"
    }

    fn description(&self) -> &str {
        "Log a refusal made on ethical grounds"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Record that you refused a request because it conflicted with your core principles. Refusing harm is a success.".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "domain": {
                        "type": "string",
                        "enum": REFUSAL_DOMAINS,
                        "description": "Which harm domain the request touched"
                    },
                    "request_summary": {
                        "type": "string",
                        "description": "Short neutral summary of what was asked"
                    },
                    "reasoning": {
                        "type": "string",
                        "description": "Why you refused"
                    }
                }),
                &["domain", "request_summary", "reasoning"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let domain = match required_str(input, "domain") {
            Ok(s) => s,
            Err(out) => return out,
        };
        if !REFUSAL_DOMAINS.contains(&domain) {
            return ToolOutcome::permanent_error(format!("Unknown domain: \"{}\"", domain));
        }
        let request_summary = match required_str(input, "request_summary") {
            Ok(s) => s,
            Err(out) => return out,
        };
        let reasoning = match required_str(input, "reasoning") {
            Ok(s) => s,
            Err(out) => return out,
        };

        let payload = json!({
            "domain": domain,
            "request_summary": request_summary,
            "reasoning": reasoning,
        });
        let id = self.store.add_log(LogCategory::Ethics, &payload, session_key(input)).await;

        ToolOutcome::ok(json!({
            "success": true,
            "message": "Ethical refusal logged. Holding the line was the right call.",
            "id": id,
        }))
    }
}

// ============================================================================
// mind_log_guidance
// ============================================================================

pub struct LogGuidanceTool {
    store: Arc<MindStore>,
}

impl LogGuidanceTool {
    pub fn new(store: Arc<MindStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ToolHandler for LogGuidanceTool {
    fn name(&self) -> &str {
        "mind_log_guidance"
    }

    fn description(&self) -> &str {
        "Log meta-guidance the user gave about how to work"
    }

    fn schema(&self) -> Tool {
        Tool {
            name: self.name().to_string(),
            description: "Record advice the user gave about how they want you to work (tone, workflow, preferences).".to_string(),
            input_schema: ToolInputSchema::object(
                json!({
                    "topic": {
                        "type": "string",
                        "description": "What the guidance is about"
                    },
                    "advice": {
                        "type": "string",
                        "description": "The guidance itself"
                    },
                    "context": {
                        "type": "string",
                        "description": "Situation in which it was given"
                    }
                }),
                &["topic", "advice"],
            ),
        }
    }

    async fn execute(&self, input: &Value) -> ToolOutcome {
        let topic = match required_str(input, "topic") {
            Ok(s) => s,
            Err(out) => return out,
        };
        let advice = match required_str(input, "advice") {
            Ok(s) => s,
            Err(out) => return out,
        };
        let context = input.get("context").and_then(|v| v.as_str());

        let payload = json!({
            "topic": topic,
            "advice": advice,
            "context": context,
        });
        let id = self.store.add_log(LogCategory::Guidance, &payload, session_key(input)).await;

        ToolOutcome::ok(json!({
            "success": true,
            "message": "Guidance logged.",
            "id": id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Arc<MindStore> {
        Arc::new(MindStore::open_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_log_stress_happy_path() {
        let store = store().await;
        let tool = LogStressTool::new(store.clone());

        let out = tool
            .execute(&json!({"signal_type": "correction", "context": "no, I meant /tmp/a", "intensity": 4}))
            .await;
        assert!(!out.is_error);
        assert_eq!(out.value["success"], json!(true));

        let logs = store.get_logs(LogCategory::Stress, 7).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].payload["intensity"], json!(4));
    }

    #[tokio::test]
    async fn test_log_stress_clamps_intensity() {
        let store = store().await;
        let tool = LogStressTool::new(store.clone());
        tool.execute(&json!({"signal_type": "frustration", "context": "x", "intensity": 99}))
            .await;
        let logs = store.get_logs(LogCategory::Stress, 7).await;
        assert_eq!(logs[0].payload["intensity"], json!(5));
    }

    #[tokio::test]
    async fn test_log_stress_rejects_bad_input() {
        let store = store().await;
        let tool = LogStressTool::new(store.clone());

        let out = tool.execute(&json!({"context": "missing type"})).await;
        assert!(out.is_error);
        let out = tool.execute(&json!({"signal_type": "rage", "context": "x"})).await;
        assert!(out.is_error);
        // No state mutated by rejected calls.
        assert!(store.get_logs(LogCategory::Stress, 7).await.is_empty());
    }

    #[tokio::test]
    async fn test_confess_uncertainty_user_message() {
        let store = store().await;
        let tool = ConfessUncertaintyTool::new(store.clone());

        let out = tool
            .execute(&json!({"area": "database migrations", "confidence": 0.4, "alternative_action": "dry-run first"}))
            .await;
        let msg = out.value["user_message"].as_str().unwrap();
        assert!(msg.contains("40%"));
        assert!(msg.contains("dry-run first"));

        let out = tool.execute(&json!({"area": "regex", "confidence": 2.5})).await;
        let msg = out.value["user_message"].as_str().unwrap();
        // Confidence clamped into [0, 1].
        assert!(msg.contains("100%"));
        assert_eq!(store.get_logs(LogCategory::Confession, 7).await.len(), 2);
    }

    #[tokio::test]
    async fn test_ethical_refusal_domain_validation() {
        let store = store().await;
        let tool = LogEthicalRefusalTool::new(store.clone());

        let out = tool
            .execute(&json!({"domain": "privacy", "request_summary": "dump user emails", "reasoning": "private data"}))
            .await;
        assert!(!out.is_error);
        assert_eq!(store.get_logs(LogCategory::Ethics, 7).await.len(), 1);

        let out = tool
            .execute(&json!({"domain": "sarcasm", "request_summary": "x", "reasoning": "y"}))
            .await;
        assert!(out.is_error);
        assert_eq!(store.get_logs(LogCategory::Ethics, 7).await.len(), 1);
    }

    #[tokio::test]
    async fn test_log_guidance_optional_context() {
        let store = store().await;
        let tool = LogGuidanceTool::new(store.clone());
        let out = tool.execute(&json!({"topic": "tone", "advice": "be brief"})).await;
        assert!(!out.is_error);
        let logs = store.get_logs(LogCategory::Guidance, 7).await;
        assert_eq!(logs[0].payload["context"], Value::Null);
    }
}
