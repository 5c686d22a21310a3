// Streaming event interpreter - single-pass state machine over one request

mod classify;
mod render;

pub use classify::{Classification, classify};
pub use render::{render_entry, render_trajectory, render_tree};

use crate::events::{EventType, PartMetadata, Part, RawEvent};
use chrono::{DateTime, Utc};

/// One item of the interpreter's ordered output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    /// Ephemeral progress notification, side channel to the main text
    Status(String),
    /// Rendered trajectory block, emitted at most once per request
    Trajectory(String),
    /// Live answer text; concatenation yields the final answer
    Text(String),
    /// Terminal failure for this request
    Error(String),
}

/// A recorded internal step, appended in event order and flushed once
#[derive(Debug, Clone)]
pub struct TrajectoryEntry {
    pub text: String,
    pub event_type: Option<EventType>,
    pub metadata: PartMetadata,
}

/// Last known state and tool usage of one agent, for tree display
#[derive(Debug, Clone, Default)]
pub struct AgentNode {
    pub state: String,
    pub tools_called: Vec<String>,
}

/// Per-request interpreter state. Created at request start, discarded at
/// request end; never shared across requests.
pub struct EventInterpreter {
    has_emitted_status: bool,
    answer_started: bool,
    finished: bool,
    trajectory: Vec<TrajectoryEntry>,
    agents: Vec<(String, AgentNode)>,
    started_at: DateTime<Utc>,
}

impl EventInterpreter {
    pub fn new() -> Self {
        Self {
            has_emitted_status: false,
            answer_started: false,
            finished: false,
            trajectory: Vec::new(),
            agents: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Whether a terminal error has ended this request's stream
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn answer_started(&self) -> bool {
        self.answer_started
    }

    /// Agents observed so far, in first-seen order
    pub fn agents(&self) -> &[(String, AgentNode)] {
        &self.agents
    }

    /// Rendered agent tree for the request, empty when nothing was tracked
    pub fn agent_tree(&self, root: &str) -> String {
        render_tree(root, &self.agents)
    }

    /// Consume one event, producing the output items to forward to the
    /// caller in order. After a terminal error, further events are ignored.
    pub fn consume(&mut self, event: RawEvent) -> Vec<OutputItem> {
        if self.finished {
            return Vec::new();
        }

        match event {
            RawEvent::StatusUpdate {
                task_id,
                agent_name,
                status,
            } => {
                let agent = agent_name
                    .or(task_id)
                    .unwrap_or_else(|| "unknown".to_string());
                // State tracking is orthogonal to text classification:
                // the tree updates even when every part is hidden.
                self.touch_agent(&agent, &status.state);

                let parts = status.message.map(|m| m.parts).unwrap_or_default();
                self.status_parts(&agent, parts)
            }

            RawEvent::ArtifactUpdate { artifact, .. } => self.answer_parts(artifact.parts),

            RawEvent::Message { parts } => self.answer_parts(parts),

            RawEvent::ToolCall {
                tool_name,
                agent_name,
            } => {
                if let Some(agent) = agent_name {
                    self.record_tool(&agent, &tool_name);
                }
                Vec::new()
            }

            RawEvent::Error { message } => {
                self.finished = true;
                vec![OutputItem::Error(format!("**Error:** {message}"))]
            }
        }
    }

    fn status_parts(&mut self, agent: &str, parts: Vec<Part>) -> Vec<OutputItem> {
        let mut out = Vec::new();

        for part in parts {
            let Some(text) = part.display_text().map(str::to_string) else {
                continue;
            };

            match classify(part.metadata.as_ref()) {
                Classification::Hidden => {}
                Classification::Thinking => {
                    self.has_emitted_status = true;
                    out.push(OutputItem::Status(text.clone()));

                    let metadata = part.metadata.clone().unwrap_or_default();
                    if metadata.event_type == Some(EventType::ToolStart) {
                        let tool = metadata.tool_name.as_deref().unwrap_or("unknown");
                        self.record_tool(agent, tool);
                    }
                    self.trajectory.push(TrajectoryEntry {
                        text,
                        event_type: metadata.event_type,
                        metadata,
                    });
                }
                Classification::Regular => out.push(OutputItem::Text(text)),
            }
        }

        out
    }

    /// Artifact or message parts: detect the status→answer transition, then
    /// emit the text live.
    fn answer_parts(&mut self, parts: Vec<Part>) -> Vec<OutputItem> {
        let mut out = Vec::new();

        let displayable = parts.iter().any(|p| p.display_text().is_some());
        if displayable && self.has_emitted_status && !self.answer_started {
            self.answer_started = true;
            out.push(OutputItem::Status("Completed".to_string()));

            let elapsed = (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0;
            let rendered = render_trajectory(&self.trajectory, elapsed);
            if !rendered.is_empty() {
                out.push(OutputItem::Trajectory(rendered));
            }
        }

        for part in parts {
            if let Some(text) = part.display_text() {
                out.push(OutputItem::Text(text.to_string()));
            }
        }

        out
    }

    fn touch_agent(&mut self, agent: &str, state: &str) {
        match self.agents.iter_mut().find(|(name, _)| name == agent) {
            Some((_, node)) => node.state = state.to_string(),
            None => self.agents.push((
                agent.to_string(),
                AgentNode {
                    state: state.to_string(),
                    tools_called: Vec::new(),
                },
            )),
        }
    }

    fn record_tool(&mut self, agent: &str, tool: &str) {
        if let Some((_, node)) = self.agents.iter_mut().find(|(name, _)| name == agent) {
            node.tools_called.push(tool.to_string());
        }
    }
}

impl Default for EventInterpreter {
    fn default() -> Self {
        Self::new()
    }
}
