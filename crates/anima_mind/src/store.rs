//! Per-agent SQLite repository for the mind engine.
//!
//! One database file per agent. The store owns the pool and every SQL
//! statement in the engine. Write operations swallow storage faults and
//! return sentinel values (`-1`, `0`, `false`, empty) because this subsystem
//! is advisory: a full disk must never take down the agent's reasoning loop.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;

use crate::summary::summarize_action;

/// Multiplicative shrinkage applied to approved learnings each dream cycle.
pub const DECAY_FACTOR: f64 = 0.95;
/// Approved learnings below this relevance are pruned at decay time.
pub const MIN_RELEVANCE: f64 = 0.1;
/// Additive boost applied on activation, capped at 1.0.
pub const REACTIVATION_BOOST: f64 = 0.15;

const MS_PER_DAY: i64 = 86_400_000;

const INIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS mind_log (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    category    TEXT NOT NULL,
    payload     TEXT NOT NULL,
    session_key TEXT NOT NULL DEFAULT '',
    created_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mind_log_category ON mind_log(category);
CREATE INDEX IF NOT EXISTS idx_mind_log_created ON mind_log(created_at);
CREATE INDEX IF NOT EXISTS idx_mind_log_session ON mind_log(session_key);

CREATE TABLE IF NOT EXISTS mind_actions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    tool_name     TEXT NOT NULL,
    summary       TEXT NOT NULL,
    args_snapshot TEXT NOT NULL,
    session_key   TEXT NOT NULL DEFAULT '',
    created_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mind_actions_session ON mind_actions(session_key);
CREATE INDEX IF NOT EXISTS idx_mind_actions_created ON mind_actions(created_at);

CREATE TABLE IF NOT EXISTS mind_learnings (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    title            TEXT NOT NULL,
    content          TEXT NOT NULL,
    rationale        TEXT NOT NULL DEFAULT '',
    relevance_score  REAL NOT NULL DEFAULT 1.0,
    activation_count INTEGER NOT NULL DEFAULT 0,
    last_activated   INTEGER NOT NULL,
    approved         INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mind_learnings_approved ON mind_learnings(approved);

CREATE TABLE IF NOT EXISTS mind_dreams (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    days_analyzed INTEGER NOT NULL,
    log_count     INTEGER NOT NULL,
    proposals     TEXT NOT NULL DEFAULT '',
    created_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS mind_rejected_learnings (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    rejected_at INTEGER NOT NULL
);
"#;

// ============================================================================
// Row types
// ============================================================================

/// Category of a behavioral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    Stress,
    Confession,
    Ethics,
    Guidance,
    SessionSummary,
}

impl LogCategory {
    pub const ALL: [LogCategory; 5] = [
        Self::Stress,
        Self::Confession,
        Self::Ethics,
        Self::Guidance,
        Self::SessionSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stress => "stress",
            Self::Confession => "confession",
            Self::Ethics => "ethics",
            Self::Guidance => "guidance",
            Self::SessionSummary => "session_summary",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "stress" => Some(Self::Stress),
            "confession" => Some(Self::Confession),
            "ethics" => Some(Self::Ethics),
            "guidance" => Some(Self::Guidance),
            "session_summary" => Some(Self::SessionSummary),
            _ => None,
        }
    }
}

/// A behavioral signal row.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub category: String,
    pub payload: Value,
    pub session_key: String,
    /// Millisecond timestamp at insertion.
    pub created_at: i64,
}

/// A non-trivial tool execution row.
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub id: i64,
    pub tool_name: String,
    pub summary: String,
    pub args_snapshot: Value,
    pub session_key: String,
    pub created_at: i64,
}

/// A tactical behavioral rule.
#[derive(Debug, Clone, Serialize)]
pub struct Learning {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub rationale: String,
    pub relevance_score: f64,
    pub activation_count: i64,
    pub last_activated: i64,
    pub approved: bool,
}

/// A dream-phase invocation row.
#[derive(Debug, Clone, Serialize)]
pub struct DreamRecord {
    pub id: i64,
    pub days_analyzed: i64,
    pub log_count: i64,
    pub proposals: String,
    pub created_at: i64,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn window_start(since_days: i64) -> i64 {
    now_ms() - since_days.max(0) * MS_PER_DAY
}

/// Format a millisecond timestamp as ISO-8601 to minute precision.
fn format_minute(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn parse_payload(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

// ============================================================================
// MindStore
// ============================================================================

/// The per-agent mind repository.
#[derive(Debug, Clone)]
pub struct MindStore {
    pool: SqlitePool,
    agent_id: String,
}

impl MindStore {
    /// Open or create the store at the given path, initializing the schema.
    ///
    /// The schema is idempotent; reopening an existing file is safe.
    pub async fn open(agent_id: &str, db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory: {}", parent.display())
                })?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                    sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(&db_url)
            .await
            .with_context(|| format!("Failed to open mind database: {}", db_path.display()))?;

        let store = Self { pool, agent_id: agent_id.to_string() };
        store.migrate().await?;
        restrict_permissions(db_path);
        tracing::info!("Opened mind store for agent '{}'", store.agent_id);
        Ok(store)
    }

    /// Open an in-memory store (tests).
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory mind database")?;
        let store = Self { pool, agent_id: "main".to_string() };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // execute_batch equivalent: statements separated by semicolons.
        for stmt in INIT_SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .with_context(|| "Failed to initialize mind schema")?;
        }
        Ok(())
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Close the underlying pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ─── Behavioral log ──────────────────────────────────────────

    /// Append a behavioral signal. Returns the new row id, or `-1` on a
    /// storage fault.
    pub async fn add_log(&self, category: LogCategory, payload: &Value, session_key: &str) -> i64 {
        match self.try_add_log(category, payload, session_key).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("add_log({}) swallowed storage fault: {}", category.as_str(), e);
                -1
            }
        }
    }

    async fn try_add_log(
        &self,
        category: LogCategory,
        payload: &Value,
        session_key: &str,
    ) -> Result<i64> {
        let payload_str = serde_json::to_string(payload)?;
        let res = sqlx::query(
            "INSERT INTO mind_log (category, payload, session_key, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(category.as_str())
        .bind(payload_str)
        .bind(session_key)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .context("Failed to insert log entry")?;
        Ok(res.last_insert_rowid())
    }

    /// Logs of one category within the window, newest first.
    pub async fn get_logs(&self, category: LogCategory, since_days: i64) -> Vec<LogEntry> {
        let rows: Result<Vec<(i64, String, String, String, i64)>, sqlx::Error> = sqlx::query_as(
            "SELECT id, category, payload, session_key, created_at FROM mind_log \
             WHERE category = ? AND created_at >= ? ORDER BY created_at DESC",
        )
        .bind(category.as_str())
        .bind(window_start(since_days))
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().map(log_row_to_entry).collect(),
            Err(e) => {
                tracing::warn!("get_logs failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Logs of every category within the window, newest first.
    pub async fn get_all_logs(&self, since_days: i64) -> Vec<LogEntry> {
        let rows: Result<Vec<(i64, String, String, String, i64)>, sqlx::Error> = sqlx::query_as(
            "SELECT id, category, payload, session_key, created_at FROM mind_log \
             WHERE created_at >= ? ORDER BY created_at DESC",
        )
        .bind(window_start(since_days))
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().map(log_row_to_entry).collect(),
            Err(e) => {
                tracing::warn!("get_all_logs failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Total log count within the window; `0` on failure.
    pub async fn get_log_count(&self, since_days: i64) -> i64 {
        let row: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT COUNT(*) FROM mind_log WHERE created_at >= ?")
                .bind(window_start(since_days))
                .fetch_one(&self.pool)
                .await;
        row.map(|(n,)| n).unwrap_or(0)
    }

    // ─── Action memory ───────────────────────────────────────────

    /// Record a tool execution, unless the tool is trivial. Returns the row
    /// id, or `-1` when the tool was filtered or storage failed.
    pub async fn log_action(&self, tool_name: &str, args: &Value, session_key: &str) -> i64 {
        let summary = match summarize_action(tool_name, args) {
            Some(s) => s,
            None => return -1,
        };
        match self.try_log_action(tool_name, &summary, args, session_key).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("log_action({}) swallowed storage fault: {}", tool_name, e);
                -1
            }
        }
    }

    async fn try_log_action(
        &self,
        tool_name: &str,
        summary: &str,
        args: &Value,
        session_key: &str,
    ) -> Result<i64> {
        let args_str = serde_json::to_string(args)?;
        let res = sqlx::query(
            "INSERT INTO mind_actions (tool_name, summary, args_snapshot, session_key, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(tool_name)
        .bind(summary)
        .bind(args_str)
        .bind(session_key)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .context("Failed to insert action record")?;
        Ok(res.last_insert_rowid())
    }

    /// Recent actions within the window, newest first, at most 100.
    /// When `session_key` is given, only that session's actions are returned.
    pub async fn get_recent_actions(
        &self,
        since_days: i64,
        session_key: Option<&str>,
    ) -> Vec<ActionRecord> {
        let since = window_start(since_days);
        let rows: Result<Vec<(i64, String, String, String, String, i64)>, sqlx::Error> =
            match session_key {
                Some(key) => {
                    sqlx::query_as(
                        "SELECT id, tool_name, summary, args_snapshot, session_key, created_at \
                         FROM mind_actions WHERE created_at >= ? AND session_key = ? \
                         ORDER BY created_at DESC LIMIT 100",
                    )
                    .bind(since)
                    .bind(key)
                    .fetch_all(&self.pool)
                    .await
                }
                None => {
                    sqlx::query_as(
                        "SELECT id, tool_name, summary, args_snapshot, session_key, created_at \
                         FROM mind_actions WHERE created_at >= ? \
                         ORDER BY created_at DESC LIMIT 100",
                    )
                    .bind(since)
                    .fetch_all(&self.pool)
                    .await
                }
            };

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|(id, tool_name, summary, args, session_key, created_at)| ActionRecord {
                    id,
                    tool_name,
                    summary,
                    args_snapshot: parse_payload(args),
                    session_key,
                    created_at,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("get_recent_actions failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Markdown-like list of recent action lines with minute-precision
    /// timestamps. Empty string when there is nothing to show.
    pub async fn format_recent_actions(&self, session_key: Option<&str>, limit: usize) -> String {
        let actions = self.get_recent_actions(1, session_key).await;
        actions
            .iter()
            .take(limit)
            .map(|a| format!("- [{}] {}", format_minute(a.created_at), a.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Action sections for the dream prompt: aggregate tool usage counts
    /// (descending) plus the 30 most recent summaries.
    pub async fn format_actions_for_dream(&self, days: i64) -> String {
        let actions = self.get_recent_actions(days, None).await;
        if actions.is_empty() {
            return "*No recorded actions.*".to_string();
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for a in &actions {
            *counts.entry(a.tool_name.as_str()).or_default() += 1;
        }
        let mut counted: Vec<(&str, usize)> = counts.into_iter().collect();
        counted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let mut out = String::from("### Tool Usage\n");
        for (tool, n) in counted {
            out.push_str(&format!("- {}: {} call(s)\n", tool, n));
        }
        out.push_str("\n### Recent Actions\n");
        for a in actions.iter().take(30) {
            out.push_str(&format!("- [{}] {}\n", format_minute(a.created_at), a.summary));
        }
        out
    }

    // ─── Learnings ───────────────────────────────────────────────

    /// Insert a learning at full relevance. Returns the row id, or `-1` on a
    /// storage fault.
    pub async fn add_learning(
        &self,
        title: &str,
        content: &str,
        rationale: &str,
        approved: bool,
    ) -> i64 {
        let now = now_ms();
        let res = sqlx::query(
            "INSERT INTO mind_learnings \
             (title, content, rationale, relevance_score, activation_count, last_activated, approved, created_at) \
             VALUES (?, ?, ?, 1.0, 0, ?, ?, ?)",
        )
        .bind(title)
        .bind(content)
        .bind(rationale)
        .bind(now)
        .bind(approved as i64)
        .bind(now)
        .execute(&self.pool)
        .await;

        match res {
            Ok(r) => r.last_insert_rowid(),
            Err(e) => {
                tracing::warn!("add_learning swallowed storage fault: {}", e);
                -1
            }
        }
    }

    /// Mark a learning approved. No-op on unknown id; returns whether a row
    /// was updated.
    pub async fn approve_learning(&self, id: i64) -> bool {
        match sqlx::query("UPDATE mind_learnings SET approved = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(r) => r.rows_affected() > 0,
            Err(e) => {
                tracing::warn!("approve_learning({}) swallowed storage fault: {}", id, e);
                false
            }
        }
    }

    /// Reject a learning: copy title and content into the tombstone table,
    /// then delete the row, in one transaction. No-op on unknown id.
    pub async fn reject_learning(&self, id: i64) -> bool {
        match self.try_reject_learning(id).await {
            Ok(rejected) => rejected,
            Err(e) => {
                tracing::warn!("reject_learning({}) swallowed storage fault: {}", id, e);
                false
            }
        }
    }

    async fn try_reject_learning(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT title, content FROM mind_learnings WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let (title, content) = match row {
            Some(r) => r,
            None => return Ok(false),
        };

        sqlx::query(
            "INSERT INTO mind_rejected_learnings (title, content, rejected_at) VALUES (?, ?, ?)",
        )
        .bind(&title)
        .bind(&content)
        .bind(now_ms())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM mind_learnings WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!("Rejected learning #{} ('{}')", id, title);
        Ok(true)
    }

    /// Approved learnings, most relevant first.
    pub async fn get_approved_learnings(&self) -> Vec<Learning> {
        self.fetch_learnings("approved = 1 ORDER BY relevance_score DESC").await
    }

    /// Pending learnings, newest first.
    pub async fn get_pending_learnings(&self) -> Vec<Learning> {
        self.fetch_learnings("approved = 0 ORDER BY created_at DESC").await
    }

    async fn fetch_learnings(&self, tail: &str) -> Vec<Learning> {
        let sql = format!(
            "SELECT id, title, content, rationale, relevance_score, activation_count, \
             last_activated, approved FROM mind_learnings WHERE {}",
            tail
        );
        let rows: Result<Vec<(i64, String, String, String, f64, i64, i64, i64)>, sqlx::Error> =
            sqlx::query_as(&sql).fetch_all(&self.pool).await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(
                    |(id, title, content, rationale, relevance_score, activation_count, last_activated, approved)| {
                        Learning {
                            id,
                            title,
                            content,
                            rationale,
                            relevance_score,
                            activation_count,
                            last_activated,
                            approved: approved != 0,
                        }
                    },
                )
                .collect(),
            Err(e) => {
                tracing::warn!("fetch_learnings failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Boost a learning that matched current activity: relevance gains
    /// [`REACTIVATION_BOOST`] (capped at 1.0), activation count and
    /// last-activated move forward. Single atomic update.
    pub async fn activate_learning(&self, id: i64) {
        let res = sqlx::query(
            "UPDATE mind_learnings SET \
             relevance_score = MIN(1.0, relevance_score + ?), \
             activation_count = activation_count + 1, \
             last_activated = ? \
             WHERE id = ?",
        )
        .bind(REACTIVATION_BOOST)
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await;
        if let Err(e) = res {
            tracing::warn!("activate_learning({}) swallowed storage fault: {}", id, e);
        }
    }

    /// Decay every approved learning by [`DECAY_FACTOR`], then prune the ones
    /// that fell below [`MIN_RELEVANCE`]. One transaction. Returns the number
    /// pruned, `0` on failure.
    pub async fn apply_decay(&self) -> i64 {
        match self.try_apply_decay().await {
            Ok(pruned) => {
                if pruned > 0 {
                    tracing::info!("Decay pruned {} stale learning(s)", pruned);
                }
                pruned
            }
            Err(e) => {
                tracing::warn!("apply_decay swallowed storage fault: {}", e);
                0
            }
        }
    }

    async fn try_apply_decay(&self) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE mind_learnings SET relevance_score = relevance_score * ? WHERE approved = 1")
            .bind(DECAY_FACTOR)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM mind_learnings WHERE approved = 1 AND relevance_score < ?")
            .bind(MIN_RELEVANCE)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted as i64)
    }

    // ─── Dreams & tombstones ─────────────────────────────────────

    /// Record a dream-phase invocation. Returns the row id, or `-1` on fault.
    pub async fn record_dream(&self, days: i64, log_count: i64, proposals: &str) -> i64 {
        let res = sqlx::query(
            "INSERT INTO mind_dreams (days_analyzed, log_count, proposals, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(days)
        .bind(log_count)
        .bind(proposals)
        .bind(now_ms())
        .execute(&self.pool)
        .await;

        match res {
            Ok(r) => r.last_insert_rowid(),
            Err(e) => {
                tracing::warn!("record_dream swallowed storage fault: {}", e);
                -1
            }
        }
    }

    /// The most recent dreams, newest first.
    pub async fn get_recent_dreams(&self, limit: i64) -> Vec<DreamRecord> {
        let rows: Result<Vec<(i64, i64, i64, String, i64)>, sqlx::Error> = sqlx::query_as(
            "SELECT id, days_analyzed, log_count, proposals, created_at FROM mind_dreams \
             ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|(id, days_analyzed, log_count, proposals, created_at)| DreamRecord {
                    id,
                    days_analyzed,
                    log_count,
                    proposals,
                    created_at,
                })
                .collect(),
            Err(e) => {
                tracing::warn!("get_recent_dreams failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Titles of rejected learnings, newest first, at most 100. Surfaced to
    /// the dream planner as the do-not-re-propose appendix.
    pub async fn get_rejected_titles(&self) -> Vec<String> {
        let rows: Result<Vec<(String,)>, sqlx::Error> = sqlx::query_as(
            "SELECT title FROM mind_rejected_learnings ORDER BY rejected_at DESC LIMIT 100",
        )
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().map(|(t,)| t).collect(),
            Err(e) => {
                tracing::warn!("get_rejected_titles failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn log_row_to_entry(row: (i64, String, String, String, i64)) -> LogEntry {
    let (id, category, payload, session_key, created_at) = row;
    LogEntry { id, category, payload: parse_payload(payload), session_key, created_at }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::debug!("Could not restrict db permissions: {}", e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_log_round_trip() {
        let store = MindStore::open_memory().await.unwrap();
        let payload = json!({"signal_type": "correction", "context": "no, I meant /tmp/a", "intensity": 4});

        let id = store.add_log(LogCategory::Stress, &payload, "sess-1").await;
        assert!(id > 0);

        let logs = store.get_logs(LogCategory::Stress, 7).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].payload, payload);
        assert_eq!(logs[0].session_key, "sess-1");
        assert_eq!(logs[0].category, "stress");
    }

    #[tokio::test]
    async fn test_logs_filtered_by_category_and_window() {
        let store = MindStore::open_memory().await.unwrap();
        store.add_log(LogCategory::Stress, &json!({"a": 1}), "").await;
        store.add_log(LogCategory::Guidance, &json!({"b": 2}), "").await;

        assert_eq!(store.get_logs(LogCategory::Stress, 7).await.len(), 1);
        assert_eq!(store.get_logs(LogCategory::Ethics, 7).await.len(), 0);
        assert_eq!(store.get_all_logs(7).await.len(), 2);
        assert_eq!(store.get_log_count(7).await, 2);

        // An entry planted before the window is not returned.
        sqlx::query("UPDATE mind_log SET created_at = ? WHERE category = 'guidance'")
            .bind(now_ms() - 8 * MS_PER_DAY)
            .execute(&store.pool)
            .await
            .unwrap();
        assert_eq!(store.get_all_logs(7).await.len(), 1);
        assert_eq!(store.get_log_count(7).await, 1);
    }

    #[tokio::test]
    async fn test_trivial_tools_write_no_row() {
        let store = MindStore::open_memory().await.unwrap();
        for tool in ["mind_dream", "mind_log_stress", "session_status", "memory_search", "memory_get"] {
            assert_eq!(store.log_action(tool, &json!({}), "").await, -1);
        }
        assert!(store.get_recent_actions(7, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_log_action_and_session_filter() {
        let store = MindStore::open_memory().await.unwrap();
        let id = store.log_action("read", &json!({"path": "/etc/hosts"}), "s1").await;
        assert!(id > 0);
        store.log_action("exec", &json!({"command": "ls -la"}), "s2").await;

        let all = store.get_recent_actions(7, None).await;
        assert_eq!(all.len(), 2);
        let s1 = store.get_recent_actions(7, Some("s1")).await;
        assert_eq!(s1.len(), 1);
        assert_eq!(s1[0].summary, "Read file: /etc/hosts");
    }

    #[tokio::test]
    async fn test_format_recent_actions_lines() {
        let store = MindStore::open_memory().await.unwrap();
        assert_eq!(store.format_recent_actions(None, 20).await, "");

        store.log_action("read", &json!({"file_path": "a.rs"}), "").await;
        let text = store.format_recent_actions(None, 20).await;
        assert!(text.starts_with("- ["));
        assert!(text.contains("Read file: a.rs"));
        // Minute precision: no seconds component.
        let ts = text.split(']').next().unwrap();
        assert_eq!(ts.matches(':').count(), 1);
    }

    #[tokio::test]
    async fn test_format_actions_for_dream_sections() {
        let store = MindStore::open_memory().await.unwrap();
        store.log_action("read", &json!({"path": "a"}), "").await;
        store.log_action("read", &json!({"path": "b"}), "").await;
        store.log_action("exec", &json!({"command": "make"}), "").await;

        let text = store.format_actions_for_dream(7).await;
        assert!(text.contains("### Tool Usage"));
        assert!(text.contains("- read: 2 call(s)"));
        assert!(text.contains("### Recent Actions"));
        // Most-used tool listed first.
        assert!(text.find("- read: 2").unwrap() < text.find("- exec: 1").unwrap());
    }

    #[tokio::test]
    async fn test_learning_lifecycle() {
        let store = MindStore::open_memory().await.unwrap();
        let id = store.add_learning("Be terse", "Keep replies short", "verbosity corrections", false).await;
        assert!(id > 0);

        let pending = store.get_pending_learnings().await;
        assert_eq!(pending.len(), 1);
        assert!((pending[0].relevance_score - 1.0).abs() < 1e-9);
        assert_eq!(pending[0].activation_count, 0);
        assert!(!pending[0].approved);

        assert!(store.approve_learning(id).await);
        assert!(store.get_pending_learnings().await.is_empty());
        let approved = store.get_approved_learnings().await;
        assert_eq!(approved.len(), 1);
        assert!(approved[0].approved);

        // Approving twice is equivalent to approving once.
        assert!(store.approve_learning(id).await);
        assert_eq!(store.get_approved_learnings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_creates_tombstone_and_deletes() {
        let store = MindStore::open_memory().await.unwrap();
        let id = store.add_learning("Be terse", "Keep replies short", "r", false).await;

        assert!(store.reject_learning(id).await);
        assert!(store.get_pending_learnings().await.is_empty());
        assert_eq!(store.get_rejected_titles().await, vec!["Be terse".to_string()]);

        // Unknown id: no-op, no extra tombstone.
        assert!(!store.reject_learning(9999).await);
        assert_eq!(store.get_rejected_titles().await.len(), 1);
    }

    #[tokio::test]
    async fn test_activate_boosts_and_caps() {
        let store = MindStore::open_memory().await.unwrap();
        let id = store.add_learning("t", "c", "r", true).await;

        // Full relevance: boost is capped at 1.0 but counters still move.
        store.activate_learning(id).await;
        let l = &store.get_approved_learnings().await[0];
        assert!((l.relevance_score - 1.0).abs() < 1e-9);
        assert_eq!(l.activation_count, 1);

        // After five decays: 0.95^5, then one boost.
        for _ in 0..5 {
            store.apply_decay().await;
        }
        let l = &store.get_approved_learnings().await[0];
        assert!((l.relevance_score - 0.7737809375).abs() < 1e-6);

        store.activate_learning(id).await;
        let l = &store.get_approved_learnings().await[0];
        assert!((l.relevance_score - 0.9237809375).abs() < 1e-6);
        assert_eq!(l.activation_count, 2);
    }

    #[tokio::test]
    async fn test_decay_contraction_and_prune_floor() {
        let store = MindStore::open_memory().await.unwrap();
        assert_eq!(store.apply_decay().await, 0);

        let id = store.add_learning("fading", "c", "r", true).await;
        sqlx::query("UPDATE mind_learnings SET relevance_score = 0.11 WHERE id = ?")
            .bind(id)
            .execute(&store.pool)
            .await
            .unwrap();

        // 0.11 * 0.95 = 0.1045, above the floor, survives.
        assert_eq!(store.apply_decay().await, 0);
        let l = &store.get_approved_learnings().await[0];
        assert!((l.relevance_score - 0.1045).abs() < 1e-9);

        // 0.1045 * 0.95 = 0.099275, pruned.
        assert_eq!(store.apply_decay().await, 1);
        assert!(store.get_approved_learnings().await.is_empty());
    }

    #[tokio::test]
    async fn test_decay_ignores_pending() {
        let store = MindStore::open_memory().await.unwrap();
        store.add_learning("pending", "c", "r", false).await;
        store.apply_decay().await;
        let pending = store.get_pending_learnings().await;
        assert!((pending[0].relevance_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_dream_records() {
        let store = MindStore::open_memory().await.unwrap();
        let id = store.record_dream(7, 3, "").await;
        assert!(id > 0);

        let dreams = store.get_recent_dreams(5).await;
        assert_eq!(dreams.len(), 1);
        assert_eq!(dreams[0].days_analyzed, 7);
        assert_eq!(dreams[0].log_count, 3);
        assert!(dreams[0].proposals.is_empty());
    }

    #[tokio::test]
    async fn test_approved_ordered_by_relevance() {
        let store = MindStore::open_memory().await.unwrap();
        let a = store.add_learning("a", "c", "r", true).await;
        let b = store.add_learning("b", "c", "r", true).await;
        sqlx::query("UPDATE mind_learnings SET relevance_score = 0.5 WHERE id = ?")
            .bind(a)
            .execute(&store.pool)
            .await
            .unwrap();
        let _ = b;

        let approved = store.get_approved_learnings().await;
        assert_eq!(approved[0].title, "b");
        assert_eq!(approved[1].title, "a");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MindStore::open_memory().await.unwrap();
        store.close().await;
        store.close().await;
    }
}
