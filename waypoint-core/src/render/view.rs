//! Render-tree types
//!
//! The pipeline produces plain data, not terminal widgets: a `ViewBlock`
//! tree the host UI maps onto whatever it draws with. Keeping the tree
//! backend-free is what makes the dispatcher rules testable.

use serde_json::Value;

use crate::message::{NetworkData, SourceRecord, ToolState};
use crate::sources::TextSegment;
use crate::tools::weather::WeatherReport;

/// One rendered element of a message part.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewBlock {
    /// A vertical group of blocks rendered in order.
    Stack(Vec<ViewBlock>),
    /// Response text, split into plain and citation segments. Plain text
    /// is a single `Plain` segment.
    Response { segments: Vec<TextSegment> },
    /// The agent's thinking text, shown while streaming.
    Reasoning { text: String, streaming: bool },
    /// The citation list shown below a cited response.
    Sources { sources: Vec<SourceRecord> },
    /// The raw network execution trace (technical details view).
    NetworkTrace { data: NetworkData, streaming: bool },
    /// Generic tool invocation view keyed by the tool's state.
    ToolCall {
        name: String,
        state: ToolState,
        input: Option<Value>,
        output: Option<Value>,
        error_text: Option<String>,
    },
    /// Specialized weather card substituted for the generic tool view.
    Weather(WeatherReport),
}

impl ViewBlock {
    pub fn plain_response(text: impl Into<String>) -> Self {
        ViewBlock::Response {
            segments: vec![TextSegment::Plain(text.into())],
        }
    }

    /// Wrap blocks in a stack, collapsing the empty and single cases.
    pub fn stack(mut blocks: Vec<ViewBlock>) -> Option<ViewBlock> {
        match blocks.len() {
            0 => None,
            1 => blocks.pop(),
            _ => Some(ViewBlock::Stack(blocks)),
        }
    }
}
