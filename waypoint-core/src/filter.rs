//! Displayable-message filter
//!
//! Pre-render pass over the conversation history. Internal control
//! messages (network completion checks, raw network-execution JSON) and
//! messages with nothing to show are dropped before any part reaches
//! the renderer.

use crate::message::{Message, Part};

/// Marker substring identifying a raw network-execution payload that
/// leaked into a text part.
const NETWORK_PAYLOAD_MARKER: &str = "\"isNetwork\":true";

/// Keep only messages the user should see. Order-preserving; the result
/// borrows from the input.
pub fn filter_displayable_messages(messages: &[Message]) -> Vec<&Message> {
    messages.iter().filter(|m| is_displayable(m)).collect()
}

fn is_displayable(message: &Message) -> bool {
    // Completion-check metadata from network routing is internal.
    if message.metadata_field("mode").and_then(|v| v.as_str()) == Some("network")
        && message
            .metadata_field("completionResult")
            .is_some_and(|v| !v.is_null())
    {
        return false;
    }

    // Raw network-execution JSON masquerading as a text part. Only the
    // first text part is inspected; that is where the leak lands.
    let leaked_payload = message
        .parts
        .iter()
        .find_map(|part| match part {
            Part::Text { text } => Some(text),
            _ => None,
        })
        .is_some_and(|text| text.contains(NETWORK_PAYLOAD_MARKER));
    if leaked_payload {
        return false;
    }

    message.parts.iter().any(has_displayable_content)
}

/// Whether one part counts as user-visible content. Empty text never
/// counts; tool, network and reasoning parts always do.
fn has_displayable_content(part: &Part) -> bool {
    match part {
        Part::Text { text } => !text.trim().is_empty(),
        Part::Reasoning { .. } | Part::Network { .. } | Part::Tool(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, NetworkData, Part, ToolPart, ToolState};

    #[test]
    fn test_drops_message_with_only_blank_text() {
        let mut empty = Message::assistant();
        empty.parts.push(Part::text(""));
        let messages = vec![empty];
        assert!(filter_displayable_messages(&messages).is_empty());
    }

    #[test]
    fn test_keeps_tool_part_with_defined_state() {
        let mut message = Message::assistant();
        message.parts.push(Part::text(""));
        message.parts.push(Part::Tool(ToolPart {
            name: "web-search".to_string(),
            state: ToolState::InputAvailable,
            ..Default::default()
        }));
        let messages = vec![message];
        assert_eq!(filter_displayable_messages(&messages).len(), 1);
    }

    #[test]
    fn test_drops_completion_check_metadata() {
        let mut message = Message::assistant();
        message.parts.push(Part::text("routing internals"));
        message.metadata = Some(serde_json::json!({
            "mode": "network",
            "completionResult": { "isComplete": true }
        }));
        let messages = vec![message];
        assert!(filter_displayable_messages(&messages).is_empty());
    }

    #[test]
    fn test_network_metadata_without_completion_result_is_kept() {
        let mut message = Message::assistant();
        message.parts.push(Part::text("an answer"));
        message.metadata = Some(serde_json::json!({ "mode": "network" }));
        let messages = vec![message];
        assert_eq!(filter_displayable_messages(&messages).len(), 1);
    }

    #[test]
    fn test_drops_raw_network_payload_text() {
        let mut message = Message::assistant();
        message
            .parts
            .push(Part::text(r#"{"isNetwork":true,"steps":[]}"#));
        let messages = vec![message];
        assert!(filter_displayable_messages(&messages).is_empty());
    }

    #[test]
    fn test_marker_in_later_text_part_does_not_hide_the_message() {
        let mut message = Message::assistant();
        message.parts.push(Part::text("an actual answer"));
        message
            .parts
            .push(Part::text(r#"{"isNetwork":true,"steps":[]}"#));
        let messages = vec![message];
        assert_eq!(filter_displayable_messages(&messages).len(), 1);
    }

    #[test]
    fn test_order_is_preserved() {
        let first = Message::user("hi");
        let mut second = Message::assistant();
        second.parts.push(Part::network(NetworkData::new("routing-agent")));
        let messages = vec![first.clone(), second.clone()];

        let kept = filter_displayable_messages(&messages);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id, first.id);
        assert_eq!(kept[1].id, second.id);
    }
}
