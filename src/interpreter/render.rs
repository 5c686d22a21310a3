// Pure rendering of trajectory entries and the agent tree

use super::{AgentNode, TrajectoryEntry};
use crate::events::EventType;

const MARKER_PREFIXES: [&str; 7] = ["🚀 ", "🤔 ", "💡 ", "🔧 ", "✅ ", "📤 ", "📋 "];

/// Render one trajectory entry into a display line. Stateless mapping keyed
/// on the entry's event type; decoration is a presentation detail, the
/// input→output mapping is the contract.
pub fn render_entry(entry: &TrajectoryEntry) -> String {
    let meta = &entry.metadata;
    let source_agent = meta.source_agent.as_deref();
    let agent_prefix = source_agent
        .map(|a| format!("[{a}] "))
        .unwrap_or_default();

    match entry.event_type {
        Some(EventType::ToolStart) => {
            let tool = meta.tool_name.as_deref().unwrap_or("unknown");
            match meta.input.as_ref().and_then(|i| i.as_object()) {
                Some(args) if !args.is_empty() => {
                    let preview: Vec<String> = args
                        .iter()
                        .take(2)
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect();
                    format!("🔧 {agent_prefix}`{tool}({})`", preview.join(", "))
                }
                _ => format!("🔧 {agent_prefix}`{tool}()`"),
            }
        }

        Some(EventType::ToolEnd) => {
            let tool = meta.tool_name.as_deref().unwrap_or("unknown");
            let duration_ms = meta.duration_ms.unwrap_or(0);
            format!("✅ {agent_prefix}`{tool}` ({duration_ms}ms)")
        }

        Some(EventType::AgentStart) => {
            if meta.is_propagated && source_agent.is_some() {
                format!("🚀 {agent_prefix}Agent started")
            } else if entry.text.contains("Delegating") || entry.text.contains("📤") {
                // Delegation notices keep their own wording
                format!("📤 {}", strip_leading_marker(&entry.text))
            } else if let Some(agent) = meta.agent_name.as_deref() {
                format!("🚀 {agent} started")
            } else {
                format!("🚀 {}", strip_leading_marker(&entry.text))
            }
        }

        Some(EventType::LlmThinking) => thinking_line("🤔", entry, source_agent),
        Some(EventType::ToolDecision) => thinking_line("💡", entry, source_agent),

        Some(EventType::SubAgentStatus) => {
            format!("📋 {}", strip_leading_marker(&entry.text))
        }

        _ => format!("• {}", entry.text),
    }
}

fn thinking_line(marker: &str, entry: &TrajectoryEntry, source_agent: Option<&str>) -> String {
    if entry.metadata.is_propagated {
        if let Some(agent) = source_agent {
            let text = strip_agent_prefix(&entry.text, agent);
            return format!("{marker} [{agent}] {}", strip_leading_marker(text));
        }
    }
    format!("{marker} {}", strip_leading_marker(&entry.text))
}

/// Render the accumulated trajectory as a collapsible block, or an empty
/// string when there is nothing to show.
pub fn render_trajectory(entries: &[TrajectoryEntry], elapsed_secs: f64) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "<details>".to_string(),
        format!("<summary>🔍 Agent Trajectory ({elapsed_secs:.1}s)</summary>"),
        String::new(),
    ];

    for entry in entries {
        lines.push(format!("- {}", render_entry(entry)));
    }

    lines.push(String::new());
    lines.push("</details>".to_string());
    lines.push(String::new());

    lines.join("\n")
}

/// Render the agent hierarchy observed during one request
pub fn render_tree(root: &str, agents: &[(String, AgentNode)]) -> String {
    if agents.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "**🌳 Agent Tree:**".to_string(),
        "```".to_string(),
        format!("📦 {root}"),
    ];

    for (i, (name, node)) in agents.iter().enumerate() {
        let is_last = i == agents.len() - 1;
        let branch = if is_last { "└──" } else { "├──" };
        lines.push(format!("  {branch} {} {name}", state_marker(&node.state)));

        let shown = node.tools_called.iter().take(3).collect::<Vec<_>>();
        let indent = if is_last { "    " } else { "│   " };
        for (j, tool) in shown.iter().enumerate() {
            let tool_branch = if j == shown.len() - 1 { "└──" } else { "├──" };
            lines.push(format!("  {indent}{tool_branch} 🔧 {tool}"));
        }
        if node.tools_called.len() > 3 {
            lines.push(format!(
                "  {indent}    ... and {} more",
                node.tools_called.len() - 3
            ));
        }
    }

    lines.push("```".to_string());
    lines.join("\n")
}

fn state_marker(state: &str) -> &'static str {
    match state.to_lowercase().as_str() {
        "working" => "⚙️",
        "completed" => "✅",
        "failed" => "❌",
        "input-required" => "❓",
        "pending" => "⏳",
        _ => "🔹",
    }
}

/// Strip a duplicated leading marker so rendering stays single-decorated
fn strip_leading_marker(text: &str) -> &str {
    for prefix in MARKER_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            return rest;
        }
    }
    text
}

/// Strip an `[agent] ` prefix already baked into propagated text
fn strip_agent_prefix<'a>(text: &'a str, agent: &str) -> &'a str {
    let prefix = format!("[{agent}] ");
    text.strip_prefix(prefix.as_str()).unwrap_or(text)
}
