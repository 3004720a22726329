//! anima_mind: the Mind Engine.
//!
//! A closed-loop, per-agent self-improvement mechanism. The agent logs
//! behavioral signals (stress, confessions, ethical refusals, guidance) and
//! non-trivial tool actions during live operation; a periodic dream phase
//! synthesizes them into proposed tactical learnings; the user approves or
//! rejects each proposal; approved learnings are injected back into the
//! system prompt, decay multiplicatively each dream cycle, and are boosted
//! when their vocabulary overlaps with recent activity.
//!
//! Everything here is advisory memory. No write path may ever block or panic
//! the agent's reasoning loop.

pub mod dream;
pub mod identity;
pub mod manager;
pub mod store;
pub mod stress;
pub mod summary;
pub mod tools;

pub use dream::{DreamOutcome, DreamPlanner};
pub use identity::IdentityBuilder;
pub use manager::{DreamCronPayload, MindDashboard, MindManager};
pub use store::{
    ActionRecord, DreamRecord, Learning, LogCategory, LogEntry, MindStore, DECAY_FACTOR,
    MIN_RELEVANCE, REACTIVATION_BOOST,
};
pub use stress::{DetectionMethod, Embedder, StressDetector, StressSignal};
pub use tools::mind_tool_handlers;
