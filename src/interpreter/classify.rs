// Total classification of text-bearing parts

use crate::events::{EventType, PartMetadata};

/// What a classified part contributes to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Dropped entirely - neither trajectory nor live text
    Hidden,
    /// Internal step: status notification + trajectory entry
    Thinking,
    /// Ordinary answer text, emitted live
    Regular,
}

/// Classify a part by its metadata. Total over all inputs: no metadata or an
/// unrecognized event type is regular text. The propagated flag never
/// changes membership - propagated sub-agent events carry the same
/// underlying event type.
pub fn classify(metadata: Option<&PartMetadata>) -> Classification {
    let Some(event_type) = metadata.and_then(|m| m.event_type) else {
        return Classification::Regular;
    };

    match event_type {
        EventType::AgentEnd => Classification::Hidden,
        EventType::AgentStart
        | EventType::LlmThinking
        | EventType::ToolDecision
        | EventType::ToolStart
        | EventType::ToolEnd
        | EventType::SubAgentStatus => Classification::Thinking,
        EventType::Unknown => Classification::Regular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_metadata_is_regular() {
        assert_eq!(classify(None), Classification::Regular);
        assert_eq!(classify(Some(&PartMetadata::default())), Classification::Regular);
    }

    #[test]
    fn test_agent_end_is_hidden() {
        let meta = PartMetadata::event(EventType::AgentEnd);
        assert_eq!(classify(Some(&meta)), Classification::Hidden);
    }

    #[test]
    fn test_thinking_event_types() {
        for event_type in [
            EventType::AgentStart,
            EventType::LlmThinking,
            EventType::ToolDecision,
            EventType::ToolStart,
            EventType::ToolEnd,
            EventType::SubAgentStatus,
        ] {
            let meta = PartMetadata::event(event_type);
            assert_eq!(classify(Some(&meta)), Classification::Thinking);
        }
    }

    #[test]
    fn test_unknown_event_type_is_regular() {
        let meta = PartMetadata::event(EventType::Unknown);
        assert_eq!(classify(Some(&meta)), Classification::Regular);
    }

    #[test]
    fn test_propagated_flag_does_not_change_membership() {
        let mut meta = PartMetadata::event(EventType::LlmThinking);
        meta.is_propagated = true;
        meta.source_agent = Some("hr-expert".to_string());
        assert_eq!(classify(Some(&meta)), Classification::Thinking);

        let mut end = PartMetadata::event(EventType::AgentEnd);
        end.is_propagated = true;
        assert_eq!(classify(Some(&end)), Classification::Hidden);
    }
}
