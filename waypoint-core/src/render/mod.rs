//! Message-part rendering pipeline
//!
//! Takes a heterogeneous stream of message parts (text, reasoning, tool
//! calls, network traces, replayed dynamic tools) and deterministically
//! renders them into a consistent, de-duplicated `ViewBlock` tree.

pub mod pipeline;
pub mod registry;
pub mod renderers;
pub mod tool_ui;
pub mod view;

pub use pipeline::{RenderContext, RenderPipeline};
pub use registry::{RendererDef, RendererRegistry, DEFAULT_PRIORITY};
pub use tool_ui::{ToolUiRegistration, ToolUiRegistry};
pub use view::ViewBlock;
