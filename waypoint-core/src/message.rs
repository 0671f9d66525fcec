//! Message and part data model
//!
//! A `Message` is an ordered sequence of typed `Part`s. The wire format
//! follows the transport's tagged-JSON convention: every part carries a
//! `"type"` field (`"text"`, `"reasoning"`, `"data-network"`, …) and tool
//! parts embed the tool name in the tag itself (`"tool-get-weather"`).
//! Parts are append-only during streaming: content may grow, tags never
//! change.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
}

/// Streaming status of the conversation as seen by the renderer.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Submitted,
    Streaming,
    #[default]
    Ready,
    Error,
}

/// Lifecycle of a tool invocation part.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    #[default]
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

/// A normalized citation source. Derived from parts or network steps,
/// never persisted on its own.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl SourceRecord {
    pub fn new(url: impl Into<String>) -> Self {
        SourceRecord {
            url: url.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Network trace
// ============================================================================

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    #[default]
    Running,
    Finished,
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Waiting,
    Running,
    Success,
    Failed,
}

/// One execution of the routing agent's multi-step plan.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkData {
    pub name: String,
    #[serde(default)]
    pub status: NetworkStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl NetworkData {
    pub fn new(name: impl Into<String>) -> Self {
        NetworkData {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// One unit of execution within a network trace.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

/// The routing decision attached to a step. `reason` is the agent's
/// natural-language justification for choosing this step.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolInvocation>,
}

/// A nested tool invocation recorded inside a step's task.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub result: Value,
}

// ============================================================================
// Parts
// ============================================================================

/// A tool invocation part. On the wire the tool name lives in the tag
/// (`"tool-get-weather"`), not in a field.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPart {
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub state: ToolState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

/// A replayed tool part from persisted history. Its output wraps the
/// child messages of a previous network execution.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicToolPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub state: ToolState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: DynamicToolOutput,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicToolOutput {
    #[serde(default)]
    pub child_messages: Vec<ChildMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChildMessage {
    #[serde(rename_all = "camelCase")]
    Tool {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_output: Option<Value>,
    },
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

/// A flat source part wrapping a nested source object.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct WrappedSource {
    #[serde(default)]
    pub source: SourceRecord,
}

/// One typed fragment of a message.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text { text: String },
    Reasoning { text: String },
    SourceUrl(SourceRecord),
    Source(WrappedSource),
    Tool(ToolPart),
    DynamicTool(DynamicToolPart),
    Network { data: NetworkData },
    /// Unrecognized tag. Preserved verbatim so persistence round-trips,
    /// rendered as nothing.
    Unknown(Value),
}

const TOOL_TAG_PREFIX: &str = "tool-";

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Part::Reasoning { text: text.into() }
    }

    pub fn network(data: NetworkData) -> Self {
        Part::Network { data }
    }

    /// The wire tag for this part.
    pub fn type_tag(&self) -> String {
        match self {
            Part::Text { .. } => "text".to_string(),
            Part::Reasoning { .. } => "reasoning".to_string(),
            Part::SourceUrl(_) => "source-url".to_string(),
            Part::Source(_) => "source".to_string(),
            Part::Tool(tool) => format!("{}{}", TOOL_TAG_PREFIX, tool.name),
            Part::DynamicTool(_) => "dynamic-tool".to_string(),
            Part::Network { .. } => "data-network".to_string(),
            Part::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    /// Non-empty text content, if this is a text part.
    pub fn non_blank_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }

    fn to_wire(&self) -> Value {
        fn tagged<T: Serialize>(tag: &str, inner: &T) -> Value {
            let mut value = serde_json::to_value(inner).unwrap_or(Value::Null);
            if let Value::Object(map) = &mut value {
                map.insert("type".to_string(), Value::String(tag.to_string()));
            }
            value
        }

        match self {
            Part::Text { text } => serde_json::json!({ "type": "text", "text": text }),
            Part::Reasoning { text } => {
                serde_json::json!({ "type": "reasoning", "text": text })
            }
            Part::SourceUrl(source) => tagged("source-url", source),
            Part::Source(wrapped) => tagged("source", wrapped),
            Part::Tool(tool) => tagged(&self.type_tag(), tool),
            Part::DynamicTool(dynamic) => tagged("dynamic-tool", dynamic),
            Part::Network { data } => serde_json::json!({ "type": "data-network", "data": data }),
            Part::Unknown(value) => value.clone(),
        }
    }

    fn from_wire(value: Value) -> Result<Self, serde_json::Error> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let part = match tag.as_str() {
            "text" => Part::Text {
                text: value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "reasoning" => Part::Reasoning {
                text: value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "source-url" => Part::SourceUrl(serde_json::from_value(value)?),
            "source" => Part::Source(serde_json::from_value(value)?),
            "dynamic-tool" => Part::DynamicTool(serde_json::from_value(value)?),
            "data-network" => Part::Network {
                data: serde_json::from_value(
                    value.get("data").cloned().unwrap_or(Value::Null),
                )?,
            },
            tool_tag if tool_tag.starts_with(TOOL_TAG_PREFIX) => {
                let mut tool: ToolPart = serde_json::from_value(value)?;
                tool.name = tool_tag[TOOL_TAG_PREFIX.len()..].to_string();
                Part::Tool(tool)
            }
            _ => Part::Unknown(value),
        };
        Ok(part)
    }
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Part {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Part::from_wire(value).map_err(D::Error::custom)
    }
}

// ============================================================================
// Message
// ============================================================================

/// One turn in the conversation: a role plus an ordered list of parts.
/// `metadata` carries transport flags (e.g. network completion checks).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Message {
            id: Uuid::new_v4().to_string(),
            role,
            parts: Vec::new(),
            metadata: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        let mut message = Message::new(Role::User);
        message.parts.push(Part::text(text));
        message
    }

    pub fn assistant() -> Self {
        Message::new(Role::Assistant)
    }

    /// Whether any part carries non-blank response text. Drives the
    /// network renderer's fallback decision.
    pub fn has_text_part(&self) -> bool {
        self.parts.iter().any(|p| p.non_blank_text().is_some())
    }

    /// Metadata field lookup, tolerant of a missing metadata object.
    pub fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_part_tag_round_trip() {
        let part = Part::Tool(ToolPart {
            name: "get-weather".to_string(),
            state: ToolState::OutputAvailable,
            input: Some(serde_json::json!({ "location": "Paris" })),
            output: Some(serde_json::json!({ "temperature": 18.0 })),
            ..Default::default()
        });

        let wire = serde_json::to_value(&part).unwrap();
        assert_eq!(wire["type"], "tool-get-weather");
        assert_eq!(wire["state"], "output-available");

        let back: Part = serde_json::from_value(wire).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn test_network_part_round_trip() {
        let mut data = NetworkData::new("routing-agent");
        data.steps.push(Step {
            id: "s1".to_string(),
            name: "web-search".to_string(),
            status: StepStatus::Success,
            task: Some(Task {
                id: "web-search".to_string(),
                task_type: "tool".to_string(),
                reason: "needs current info".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        let part = Part::network(data);

        let wire = serde_json::to_value(&part).unwrap();
        assert_eq!(wire["type"], "data-network");
        assert_eq!(wire["data"]["steps"][0]["task"]["reason"], "needs current info");

        let back: Part = serde_json::from_value(wire).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn test_unknown_tag_is_preserved() {
        let wire = serde_json::json!({ "type": "step-start", "foo": 1 });
        let part: Part = serde_json::from_value(wire.clone()).unwrap();
        assert!(matches!(part, Part::Unknown(_)));
        assert_eq!(serde_json::to_value(&part).unwrap(), wire);
    }

    #[test]
    fn test_has_text_part_ignores_blank_text() {
        let mut message = Message::assistant();
        message.parts.push(Part::text("   "));
        assert!(!message.has_text_part());
        message.parts.push(Part::text("Try Rome"));
        assert!(message.has_text_part());
    }

    #[test]
    fn test_child_message_tags() {
        let wire = serde_json::json!({
            "type": "tool",
            "toolName": "web-search",
            "toolOutput": { "sources": [] }
        });
        let child: ChildMessage = serde_json::from_value(wire).unwrap();
        match child {
            ChildMessage::Tool { tool_name, .. } => {
                assert_eq!(tool_name.as_deref(), Some("web-search"));
            }
            other => panic!("unexpected child: {other:?}"),
        }
    }
}
