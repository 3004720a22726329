//! The Spiritual Biology prompt section.
//!
//! Built on every prompt assembly from the frozen principle constant plus the
//! store's approved learnings and recent actions. A single-slot cache keeps
//! the rendered section for a few minutes. This is prompt decoration, not
//! authorization, so a slightly stale section is acceptable and a cache miss
//! must never block the agent loop.

use std::collections::HashSet;
use std::sync::Mutex;

use anima_core::principles::format_principles;
use chrono::Utc;

use crate::store::MindStore;

const DEFAULT_TTL_MS: i64 = 5 * 60 * 1000;

const NO_LEARNINGS: &str = "*No approved learnings yet.*";

const PROTOCOL: &str = "\
When the user shows frustration or corrects you, log it with mind_log_stress. \
When your confidence in an approach drops below 70%, confess it with \
mind_confess_uncertainty instead of guessing. When you refuse a request on \
ethical grounds, log it immediately with mind_log_ethical_refusal — refusing \
harm is a success, not a failure. When the user teaches you how they want \
things done, log it with mind_log_guidance. Write all log entries in the \
language of the conversation.";

const COST_AWARENESS: &str = "\
Every model call and every tool call costs the user money. Prefer short, \
dense output; do not re-derive what you already established; batch related \
work into a single pass.";

#[derive(Clone)]
struct CachedSection {
    formatted: String,
    built_at: i64,
    agent_id: String,
}

/// Renders and caches the Spiritual Biology section.
pub struct IdentityBuilder {
    cache: Mutex<Option<CachedSection>>,
    ttl_ms: i64,
}

impl Default for IdentityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityBuilder {
    pub fn new() -> Self {
        Self { cache: Mutex::new(None), ttl_ms: DEFAULT_TTL_MS }
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self { cache: Mutex::new(None), ttl_ms: (ttl_secs as i64) * 1000 }
    }

    pub fn from_config(config: &anima_core::MindConfig) -> Self {
        Self::with_ttl_secs(config.identity_cache_ttl_secs)
    }

    /// Drop the cached section; the next build re-renders from the store.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    /// Build (or reuse) the section for this agent. When `session_key` is
    /// present, learnings whose vocabulary overlaps the last day's actions
    /// are activated first, so contextually relevant learnings outrun decay.
    pub async fn build_section(&self, store: &MindStore, session_key: Option<&str>) -> String {
        let now = Utc::now().timestamp_millis();

        if let Ok(cache) = self.cache.lock() {
            if let Some(c) = cache.as_ref() {
                if c.agent_id == store.agent_id() && now - c.built_at < self.ttl_ms {
                    return c.formatted.clone();
                }
            }
        }

        if session_key.is_some() {
            self.activate_matching(store).await;
        }

        let formatted = self.render(store, session_key).await;

        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(CachedSection {
                formatted: formatted.clone(),
                built_at: now,
                agent_id: store.agent_id().to_string(),
            });
        }
        formatted
    }

    /// Selective activation: boost approved learnings that share a word of
    /// length > 3 with any tool summary from the last day.
    async fn activate_matching(&self, store: &MindStore) {
        let actions = store.get_recent_actions(1, None).await;
        if actions.is_empty() {
            return;
        }

        let recent_words: HashSet<String> = actions
            .iter()
            .flat_map(|a| significant_words(&a.summary))
            .collect();

        for learning in store.get_approved_learnings().await {
            let shares_word = significant_words(&learning.content)
                .into_iter()
                .any(|w| recent_words.contains(&w));
            if shares_word {
                tracing::debug!("Activating learning #{} ('{}')", learning.id, learning.title);
                store.activate_learning(learning.id).await;
            }
        }
    }

    async fn render(&self, store: &MindStore, session_key: Option<&str>) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str("## Spiritual Biology\n\n");

        out.push_str("### Immutable Core Principles\n");
        out.push_str(&format_principles());
        out.push('\n');

        out.push_str("### Tactical Learnings\n");
        let approved = store.get_approved_learnings().await;
        if approved.is_empty() {
            out.push_str(NO_LEARNINGS);
            out.push('\n');
        } else {
            for l in &approved {
                out.push_str(&format!(
                    "- (relevance {:.2}) {}: {}\n",
                    l.relevance_score, l.title, l.content
                ));
            }
        }
        out.push('\n');

        out.push_str("### Protocol\n");
        out.push_str(PROTOCOL);
        out.push_str("\n\n");

        let actions = store.format_recent_actions(session_key, 10).await;
        if !actions.is_empty() {
            out.push_str("### Action Memory\n");
            out.push_str(&actions);
            out.push_str("\n\n");
        }

        out.push_str("### Cost Awareness\n");
        out.push_str(COST_AWARENESS);
        out.push('\n');

        out
    }
}

/// Lowercased alphanumeric-trimmed words longer than 3 chars.
fn significant_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.to_lowercase())
        .collect()
}
