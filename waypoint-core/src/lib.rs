//! Core types and engine for the waypoint travel assistant
//!
//! This crate provides:
//! - **Messages**: the part-based `Message` model and its tagged wire format
//! - **Rendering**: `RenderPipeline` turning message parts into `ViewBlock`s
//! - **Extraction**: `extract_network_data`, citation splitting, source collection
//! - **Routing**: `RoutingAgent` executing tool plans as `NetworkData` traces
//! - **Tools**: weather, destination catalog, and web search backends
//! - **Storage**: `ThreadStore`, a SQLite-backed thread/message store
//! - **Engine**: `ChatEngine` wiring it all together behind channels
//!
//! # Example
//!
//! ```ignore
//! use waypoint_core::render::RenderPipeline;
//!
//! let pipeline = RenderPipeline::with_defaults();
//! let blocks = pipeline.render_message(&message, status, is_last);
//! ```
pub mod engine;
pub mod filter;
pub mod message;
pub mod network;
pub mod render;
pub mod routing;
pub mod sources;
pub mod storage;
pub mod tools;

pub use engine::{ChatEngine, EngineCommand, EngineEvent};
pub use filter::filter_displayable_messages;
pub use message::{ChatStatus, Message, NetworkData, Part, Role, SourceRecord};
pub use network::{extract_network_data, NetworkView};
pub use render::{RenderPipeline, ViewBlock};
pub use routing::{RoutingAgent, RoutingModel, RuleRouter};
pub use storage::{ThreadInfo, ThreadStore};
pub use tools::ToolSet;
