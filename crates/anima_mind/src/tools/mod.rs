//! The nine externally-callable mind tools.
//!
//! Each handler validates its own arguments, writes through the store, and
//! answers with a `{success, message, ...}` JSON document. Nothing here may
//! raise into the agent runtime: malformed input becomes a permanent error
//! outcome, storage faults are already swallowed one layer down.

mod dream_tools;
mod learning_tools;
mod log_tools;

pub use dream_tools::DreamTool;
pub use learning_tools::{ApproveLearningTool, GetLearningsTool, RejectLearningTool, SaveLearningTool};
pub use log_tools::{ConfessUncertaintyTool, LogEthicalRefusalTool, LogGuidanceTool, LogStressTool};

use std::sync::Arc;

use anima_core::ToolHandler;

use crate::identity::IdentityBuilder;
use crate::store::MindStore;

/// All nine handlers for one agent, ready for registration with the host
/// tool runtime.
pub fn mind_tool_handlers(
    store: Arc<MindStore>,
    identity: Arc<IdentityBuilder>,
) -> Vec<Box<dyn ToolHandler>> {
    vec![
        Box::new(LogStressTool::new(store.clone())),
        Box::new(ConfessUncertaintyTool::new(store.clone())),
        Box::new(LogEthicalRefusalTool::new(store.clone())),
        Box::new(LogGuidanceTool::new(store.clone())),
        Box::new(DreamTool::new(store.clone(), identity.clone())),
        Box::new(GetLearningsTool::new(store.clone())),
        Box::new(ApproveLearningTool::new(store.clone(), identity.clone())),
        Box::new(RejectLearningTool::new(store.clone(), identity.clone())),
        Box::new(SaveLearningTool::new(store, identity)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_nine_tools_registered_with_mind_prefix() {
        let store = Arc::new(MindStore::open_memory().await.unwrap());
        let identity = Arc::new(IdentityBuilder::new());
        let handlers = mind_tool_handlers(store, identity);

        assert_eq!(handlers.len(), 9);
        for handler in &handlers {
            // The engine's own tools are trivial by construction, so the
            // action memory never records the engine observing itself.
            assert!(handler.name().starts_with("mind_"), "bad name: {}", handler.name());
            assert_eq!(handler.schema().name, handler.name());
        }
    }
}
