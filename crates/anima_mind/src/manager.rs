//! Per-agent store registry, dream cron payload, and dashboard aggregation.
//!
//! Each agent gets its own database file; the manager memoizes open stores
//! and closes them all at graceful shutdown. The cron payload is a
//! description for the external scheduler; the engine never fires it.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::Mutex;

use anima_core::config::DEFAULT_DREAM_CRON;

use crate::store::{DreamRecord, Learning, LogCategory, LogEntry, MindStore};

/// Normalize an agent identifier: trimmed, lowercased, empty defaults to
/// `main`.
pub fn normalize_agent_id(raw: &str) -> String {
    let id = raw.trim().to_lowercase();
    if id.is_empty() {
        "main".to_string()
    } else {
        id
    }
}

/// Cron payload description handed to the external scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct DreamCronPayload {
    pub id: String,
    pub cron: String,
    pub session_target: String,
    pub wake_mode: String,
    pub timeout_secs: u64,
    pub message: String,
}

/// Aggregate view for an external dashboard UI.
#[derive(Debug, Serialize)]
pub struct MindDashboard {
    pub agent_id: String,
    pub approved_learnings: Vec<Learning>,
    pub pending_learnings: Vec<Learning>,
    pub recent_dreams: Vec<DreamRecord>,
    pub logs_by_category: BTreeMap<String, Vec<LogEntry>>,
    pub total_log_count: i64,
    pub rejected_titles: Vec<String>,
}

/// Registry of per-agent mind stores.
pub struct MindManager {
    stores: Mutex<HashMap<String, Arc<MindStore>>>,
}

impl Default for MindManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MindManager {
    pub fn new() -> Self {
        Self { stores: Mutex::new(HashMap::new()) }
    }

    /// Get or lazily create the store for an agent. The database lives at
    /// `<data_dir>/mind/<normalized_agent_id>.db`.
    pub async fn get_mind_store(&self, agent_id: &str, data_dir: &Path) -> Result<Arc<MindStore>> {
        let id = normalize_agent_id(agent_id);
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(&id) {
            return Ok(store.clone());
        }

        let db_path = data_dir.join("mind").join(format!("{}.db", id));
        let store = Arc::new(MindStore::open(&id, &db_path).await?);
        stores.insert(id, store.clone());
        Ok(store)
    }

    /// Lookup without creating.
    pub async fn has_mind_store(&self, agent_id: &str) -> bool {
        self.stores.lock().await.contains_key(&normalize_agent_id(agent_id))
    }

    /// Close every store and clear the registry. Part of graceful shutdown.
    pub async fn close_all(&self) {
        let mut stores = self.stores.lock().await;
        for (id, store) in stores.drain() {
            tracing::info!("Closing mind store for agent '{}'", id);
            store.close().await;
        }
    }

    /// Build the dream cron payload for an agent. The cron expression comes
    /// from `OPENCLAW_DREAM_CRON`, defaulting to 3 AM daily.
    pub fn dream_cron_payload(agent_id: &str) -> DreamCronPayload {
        let id = normalize_agent_id(agent_id);
        let cron = std::env::var("OPENCLAW_DREAM_CRON")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DREAM_CRON.to_string());

        DreamCronPayload {
            id: format!("mind-dream-{}", id),
            cron,
            session_target: "isolated".to_string(),
            wake_mode: "next-heartbeat".to_string(),
            timeout_secs: 120,
            message: "[DREAM_PHASE] Analyze recent stress patterns, confessions, and action logs. \
                      Use mind_dream to build the analysis prompt, then propose tactical learnings \
                      with mind_save_learning."
                .to_string(),
        }
    }

    /// Aggregate snapshot of one agent's mind for an external UI.
    pub async fn dashboard_snapshot(
        &self,
        agent_id: &str,
        data_dir: &Path,
        since_days: i64,
    ) -> Result<MindDashboard> {
        let store = self.get_mind_store(agent_id, data_dir).await?;

        let mut logs_by_category = BTreeMap::new();
        for category in LogCategory::ALL {
            logs_by_category
                .insert(category.as_str().to_string(), store.get_logs(category, since_days).await);
        }

        Ok(MindDashboard {
            agent_id: normalize_agent_id(agent_id),
            approved_learnings: store.get_approved_learnings().await,
            pending_learnings: store.get_pending_learnings().await,
            recent_dreams: store.get_recent_dreams(5).await,
            logs_by_category,
            total_log_count: store.get_log_count(since_days).await,
            rejected_titles: store.get_rejected_titles().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_agent_id() {
        assert_eq!(normalize_agent_id("  Alice "), "alice");
        assert_eq!(normalize_agent_id(""), "main");
        assert_eq!(normalize_agent_id("   "), "main");
        assert_eq!(normalize_agent_id("MAIN"), "main");
    }

    #[tokio::test]
    async fn test_stores_are_memoized() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = MindManager::new();

        let a = manager.get_mind_store("Agent-X", dir.path()).await.unwrap();
        let b = manager.get_mind_store(" agent-x ", dir.path()).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_per_agent_isolation() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = MindManager::new();

        let a = manager.get_mind_store("A", dir.path()).await.unwrap();
        let b = manager.get_mind_store("B", dir.path()).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        a.add_learning("only in A", "content", "r", true).await;
        assert_eq!(a.get_approved_learnings().await.len(), 1);
        assert!(b.get_approved_learnings().await.is_empty());

        // Distinct files on disk.
        assert!(dir.path().join("mind").join("a.db").exists());
        assert!(dir.path().join("mind").join("b.db").exists());
    }

    #[tokio::test]
    async fn test_has_and_close_all() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = MindManager::new();

        assert!(!manager.has_mind_store("A").await);
        manager.get_mind_store("A", dir.path()).await.unwrap();
        assert!(manager.has_mind_store("A").await);

        manager.close_all().await;
        assert!(!manager.has_mind_store("A").await);
    }

    #[test]
    fn test_dream_cron_payload_shape() {
        let payload = MindManager::dream_cron_payload("Atlas");
        assert_eq!(payload.id, "mind-dream-atlas");
        assert_eq!(payload.session_target, "isolated");
        assert_eq!(payload.wake_mode, "next-heartbeat");
        assert_eq!(payload.timeout_secs, 120);
        assert!(payload.message.starts_with("[DREAM_PHASE]"));
        assert!(payload.message.contains("mind_dream"));
    }

    #[tokio::test]
    async fn test_dashboard_snapshot_aggregates() {
        let dir = tempfile::TempDir::new().unwrap();
        let manager = MindManager::new();
        let store = manager.get_mind_store("dash", dir.path()).await.unwrap();

        store.add_log(LogCategory::Stress, &json!({"x": 1}), "").await;
        store.add_log(LogCategory::Guidance, &json!({"y": 2}), "").await;
        store.add_learning("approved", "c", "r", true).await;
        let rejected = store.add_learning("nope", "c", "r", false).await;
        store.reject_learning(rejected).await;
        store.record_dream(7, 2, "").await;

        let dash = manager.dashboard_snapshot("dash", dir.path(), 7).await.unwrap();
        assert_eq!(dash.agent_id, "dash");
        assert_eq!(dash.total_log_count, 2);
        assert_eq!(dash.approved_learnings.len(), 1);
        assert!(dash.pending_learnings.is_empty());
        assert_eq!(dash.recent_dreams.len(), 1);
        assert_eq!(dash.rejected_titles, vec!["nope".to_string()]);
        assert_eq!(dash.logs_by_category["stress"].len(), 1);
        assert_eq!(dash.logs_by_category["ethics"].len(), 0);
    }
}
