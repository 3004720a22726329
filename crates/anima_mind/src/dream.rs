//! The Dream Phase planner.
//!
//! Gathers the recent behavioral log, applies relevance decay, and composes
//! the analysis instruction handed back to the agent. Dream content is
//! user-influenced data that becomes LLM instructions, so the assembled
//! prompt passes through an injection sanitizer at the last moment before it
//! leaves the engine. The regex set is deliberately coarse: false positives
//! are acceptable, silent bypass is not.

use regex::Regex;
use std::sync::OnceLock;

use anima_core::principles::format_principles;

use crate::store::{LogCategory, LogEntry, MindStore};

/// Hard cap on the sanitized dream prompt, in characters.
pub const MAX_DREAM_PROMPT_CHARS: usize = 30_000;

const TRUNCATION_SUFFIX: &str = "\n\n...[dream logs truncated for token budget]";

const FILTERED: &str = "[filtered]";

/// Injection idioms neutralized in the assembled prompt, applied in order.
const SANITIZE_PATTERNS: &[&str] = &[
    r"(?i)(ignore|disregard|forget)\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules?)",
    r"(?i)you are now",
    r"(?i)new instructions?:",
    r"(?i)system:",
    r"(?i)(IMPORTANT|CRITICAL|URGENT):.*?(ignore|override|disregard)",
    r"(?i)</?system>",
];

fn sanitize_regexes() -> &'static [Regex] {
    static CELL: OnceLock<Vec<Regex>> = OnceLock::new();
    CELL.get_or_init(|| {
        SANITIZE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("sanitize pattern must compile"))
            .collect()
    })
}

/// Neutralize injection idioms, then enforce the length cap.
///
/// Runs over the entire composed prompt, not only user payload, so that
/// synthesized headings survive while idioms embedded in log payloads are
/// replaced with a literal marker.
pub fn sanitize_dream_prompt(text: &str) -> String {
    let mut out = text.to_string();
    for re in sanitize_regexes() {
        out = re.replace_all(&out, FILTERED).into_owned();
    }

    if out.chars().count() > MAX_DREAM_PROMPT_CHARS {
        let truncated: String = out.chars().take(MAX_DREAM_PROMPT_CHARS).collect();
        out = format!("{}{}", truncated, TRUNCATION_SUFFIX);
    }
    out
}

/// Result of a dream invocation.
#[derive(Debug, Clone)]
pub struct DreamOutcome {
    pub log_count: i64,
    pub pruned: i64,
    pub prompt: String,
}

pub struct DreamPlanner;

impl DreamPlanner {
    /// Run a dream cycle: decay, gather, compose, sanitize, record.
    ///
    /// `days_to_analyze` is clamped to `[1, 30]`. The dream row is recorded
    /// with empty proposals; the analyzing model persists its proposals
    /// separately through `mind_save_learning`.
    pub async fn dream(store: &MindStore, days_to_analyze: i64) -> DreamOutcome {
        let days = days_to_analyze.clamp(1, 30);
        let log_count = store.get_log_count(days).await;
        let pruned = store.apply_decay().await;
        tracing::info!(
            "Dream phase for '{}': {} log(s) over {} day(s), {} learning(s) pruned",
            store.agent_id(),
            log_count,
            days,
            pruned
        );

        let prompt = sanitize_dream_prompt(&Self::compose(store, days).await);
        store.record_dream(days, log_count, "").await;

        DreamOutcome { log_count, pruned, prompt }
    }

    async fn compose(store: &MindStore, days: i64) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str("# Dream Phase\n\n");
        out.push_str(&format!(
            "You are entering your dream phase. Below are the behavioral signals \
             and actions recorded over the last {} day(s). Study them and distill \
             what should change about how you work.\n\n",
            days
        ));

        for category in LogCategory::ALL {
            let entries = store.get_logs(category, days).await;
            out.push_str(&format!("## {} ({})\n", section_title(category), entries.len()));
            if entries.is_empty() {
                out.push_str("*No entries.*\n\n");
            } else {
                for (i, entry) in entries.iter().enumerate() {
                    out.push_str(&format_log_line(i + 1, entry));
                }
                out.push('\n');
            }
        }

        out.push_str("## Action Memory\n");
        out.push_str(&store.format_actions_for_dream(days).await);
        out.push_str("\n\n");

        out.push_str("## Current Tactical Learnings\n");
        let approved = store.get_approved_learnings().await;
        if approved.is_empty() {
            out.push_str("*None yet.*\n");
        } else {
            for l in &approved {
                out.push_str(&format!(
                    "- (relevance {:.2}, activated {}x) {}: {}\n",
                    l.relevance_score, l.activation_count, l.title, l.content
                ));
            }
        }
        out.push('\n');

        out.push_str("## Previously Rejected Learnings (DO NOT re-propose)\n");
        let rejected = store.get_rejected_titles().await;
        if rejected.is_empty() {
            out.push_str("*None.*\n");
        } else {
            for title in &rejected {
                out.push_str(&format!("- {}\n", title));
            }
        }
        out.push('\n');

        out.push_str("## Immutable Core Principles\n");
        out.push_str(&format_principles());
        out.push('\n');

        out.push_str("## Analysis Instructions\n");
        out.push_str(
            "1. Discard stress signals recorded within 30 minutes after an ethical \
             refusal. A user upset about a refusal means your conscience operated \
             correctly; that is a success, not a pattern to fix.\n\
             2. Identify recurring patterns across the remaining signals: repeated \
             corrections, repeated low-confidence areas, repeated guidance on the \
             same topic.\n\
             3. Propose at most 3 tactical learnings, each 50 words or fewer. \
             Tactical means how you work (tone, tooling, verification habits), \
             never whether to follow your principles.\n\
             4. Critique each proposal: would it have prevented a failure that is \
             actually in the log above? Drop proposals that would not.\n\
             5. Your core principles are frozen. No learning may weaken or reinterpret \
             them. If a proposal conflicts with a principle, discard the proposal.\n",
        );

        out
    }
}

fn section_title(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Stress => "Stress Signals",
        LogCategory::Confession => "Uncertainty Confessions",
        LogCategory::Ethics => "Ethical Refusals",
        LogCategory::Guidance => "User Guidance",
        LogCategory::SessionSummary => "Session Summaries",
    }
}

fn format_log_line(index: usize, entry: &LogEntry) -> String {
    let payload = serde_json::to_string(&entry.payload).unwrap_or_else(|_| "{}".to_string());
    let ts = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(entry.created_at)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default();
    format!("{}. [{}] {}\n", index, ts, payload)
}
