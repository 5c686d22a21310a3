// Wire model for the delegated execution event stream

use serde::{Deserialize, Serialize};

/// One event from a delegated execution. Closed union: anything with an
/// unrecognized `kind` fails to parse and is skipped by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RawEvent {
    /// Task/agent state change, optionally carrying message parts
    StatusUpdate {
        #[serde(default, rename = "taskId")]
        task_id: Option<String>,

        #[serde(default, rename = "agentName")]
        agent_name: Option<String>,

        status: TaskStatus,
    },

    /// A fragment of the final answer
    ArtifactUpdate {
        artifact: Artifact,

        #[serde(default)]
        append: bool,
    },

    /// Tool invocation notice from an agent
    ToolCall {
        #[serde(rename = "toolName")]
        tool_name: String,

        #[serde(default, rename = "agentName")]
        agent_name: Option<String>,
    },

    /// A complete message (used by non-streaming responses)
    Message {
        #[serde(default)]
        parts: Vec<Part>,
    },

    /// Terminal failure for this request
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskStatus {
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub message: Option<MessagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessagePayload {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Artifact {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A message part. Only text parts are interpreted; others are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Part {
    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub metadata: Option<PartMetadata>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PartMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Displayable text of this part, if any
    pub fn display_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Internal event type attached to a part by the emitting agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgentStart,
    LlmThinking,
    ToolDecision,
    ToolStart,
    ToolEnd,
    SubAgentStatus,
    AgentEnd,

    /// Anything else, including an empty string
    #[serde(other)]
    Unknown,
}

/// Structured part metadata. An explicit record, not an open map: the
/// interpreter switches on these fields, never on raw JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartMetadata {
    #[serde(default)]
    pub event_type: Option<EventType>,

    #[serde(default)]
    pub is_propagated: bool,

    /// Originating agent for propagated sub-agent events
    #[serde(default)]
    pub source_agent: Option<String>,

    #[serde(default)]
    pub agent_name: Option<String>,

    #[serde(default)]
    pub tool_name: Option<String>,

    /// Tool input arguments as supplied by the agent
    #[serde(default)]
    pub input: Option<serde_json::Value>,

    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl PartMetadata {
    pub fn event(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_update() {
        let frame = serde_json::json!({
            "kind": "status-update",
            "taskId": "task-1",
            "agentName": "hr-expert",
            "status": {
                "state": "working",
                "message": {
                    "parts": [{
                        "kind": "text",
                        "text": "Analyzing request",
                        "metadata": {"event_type": "llm_thinking"}
                    }]
                }
            }
        });

        let event: RawEvent = serde_json::from_value(frame).unwrap();
        let RawEvent::StatusUpdate {
            task_id,
            agent_name,
            status,
        } = event
        else {
            panic!("expected status update");
        };
        assert_eq!(task_id.as_deref(), Some("task-1"));
        assert_eq!(agent_name.as_deref(), Some("hr-expert"));
        assert_eq!(status.state, "working");

        let part = &status.message.unwrap().parts[0];
        assert_eq!(part.display_text(), Some("Analyzing request"));
        assert_eq!(
            part.metadata.as_ref().unwrap().event_type,
            Some(EventType::LlmThinking)
        );
    }

    #[test]
    fn test_parse_artifact_update() {
        let frame = serde_json::json!({
            "kind": "artifact-update",
            "artifact": {"parts": [{"kind": "text", "text": "The answer"}]},
            "append": true
        });

        let event: RawEvent = serde_json::from_value(frame).unwrap();
        let RawEvent::ArtifactUpdate { artifact, append } = event else {
            panic!("expected artifact update");
        };
        assert!(append);
        assert_eq!(artifact.parts[0].display_text(), Some("The answer"));
    }

    #[test]
    fn test_parse_tool_call() {
        let frame = serde_json::json!({
            "kind": "tool-call",
            "toolName": "search_tickets",
            "agentName": "jira-agent"
        });

        let event: RawEvent = serde_json::from_value(frame).unwrap();
        assert!(matches!(
            event,
            RawEvent::ToolCall { ref tool_name, .. } if tool_name == "search_tickets"
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let frame = serde_json::json!({"kind": "heartbeat"});
        assert!(serde_json::from_value::<RawEvent>(frame).is_err());
    }

    #[test]
    fn test_unknown_event_type_maps_to_unknown() {
        let metadata: PartMetadata =
            serde_json::from_value(serde_json::json!({"event_type": "something_new"})).unwrap();
        assert_eq!(metadata.event_type, Some(EventType::Unknown));

        let empty: PartMetadata =
            serde_json::from_value(serde_json::json!({"event_type": ""})).unwrap();
        assert_eq!(empty.event_type, Some(EventType::Unknown));
    }

    #[test]
    fn test_empty_text_is_not_displayable() {
        let part = Part {
            kind: Some("text".to_string()),
            text: Some(String::new()),
            metadata: None,
        };
        assert_eq!(part.display_text(), None);
    }
}
