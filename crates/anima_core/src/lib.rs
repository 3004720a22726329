pub mod config;
pub mod principles;
pub mod tools;

pub use config::MindConfig;
pub use principles::{format_principles, Principle, PRINCIPLES};
pub use tools::{Tool, ToolErrorKind, ToolHandler, ToolInputSchema, ToolOutcome};
