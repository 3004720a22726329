//! Tool-call summarization for the action memory.
//!
//! Maps `(tool_name, args)` to a one-line memorable summary. Trivial internal
//! tools map to `None` and are never recorded: the engine must not observe
//! itself observing.

use serde_json::Value;

/// Tools that never produce an action record. The engine's own `mind_*`
/// surface is filtered wholesale.
const TRIVIAL_TOOLS: &[&str] = &["session_status", "memory_search", "memory_get"];

const CMD_WIDTH: usize = 80;
const PATH_WIDTH: usize = 80;

pub fn is_trivial_tool(tool_name: &str) -> bool {
    tool_name.starts_with("mind_") || TRIVIAL_TOOLS.contains(&tool_name)
}

/// Produce a summary line for a tool call, or `None` for trivial tools.
/// Unrecognized tools get a generic `Used tool:` line so the action memory
/// stays complete as the host runtime grows.
pub fn summarize_action(tool_name: &str, args: &Value) -> Option<String> {
    if is_trivial_tool(tool_name) {
        return None;
    }

    let summary = match tool_name {
        "read" => format!("Read file: {}", str_arg(args, &["path", "file_path"], PATH_WIDTH)),
        "write" => format!("Wrote file: {}", str_arg(args, &["path", "file_path"], PATH_WIDTH)),
        "edit" => format!("Edited file: {}", str_arg(args, &["path", "file_path"], PATH_WIDTH)),
        "exec" | "bash" => format!("Ran command: {}", str_arg(args, &["command", "cmd"], CMD_WIDTH)),
        "web_fetch" => format!("Fetched: {}", str_arg(args, &["url", "action"], CMD_WIDTH)),
        "web_search" => format!("Searched web: {}", str_arg(args, &["query"], CMD_WIDTH)),
        "browser" => format!("Browser action: {}", str_arg(args, &["action", "url"], CMD_WIDTH)),
        "message" => format!("Sent message to {}", str_arg(args, &["to", "channel"], CMD_WIDTH)),
        "cron" => format!("Managed schedule: {}", str_arg(args, &["action"], CMD_WIDTH)),
        other => format!("Used tool: {}", other),
    };

    Some(truncate_ellipsis(&summary, 100))
}

/// First matching string field among the aliases, truncated; `?` when absent.
fn str_arg(args: &Value, aliases: &[&str], width: usize) -> String {
    for key in aliases {
        if let Some(s) = args.get(*key).and_then(|v| v.as_str()) {
            return truncate_ellipsis(s, width);
        }
    }
    "?".to_string()
}

/// Char-boundary-safe truncation with a trailing ellipsis.
fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", truncated)
}
