//! Message-part render pipeline
//!
//! The pipeline owns both registries and dispatches every part of a
//! message to the single renderer the registry resolves for it. It is
//! constructed once at startup (register everything, then share it
//! read-only) and keeps no per-message state: every render pass is a
//! pure function of the message and the streaming status.

use crate::message::{ChatStatus, Message, Part};
use crate::render::registry::{RendererDef, RendererRegistry};
use crate::render::renderers::{
    dynamic_tool_renderer, network_renderer, reasoning_renderer, text_renderer, tool_renderer,
    weather_card_registration, weather_renderer,
};
use crate::render::tool_ui::{ToolUiRegistration, ToolUiRegistry};
use crate::render::view::ViewBlock;

/// Everything a renderer may consult about the part's surroundings.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub status: ChatStatus,
    pub is_last_message: bool,
    /// Whether a sibling part carries non-blank response text.
    pub has_text_part: bool,
    pub all_parts: &'a [Part],
}

#[derive(Default)]
pub struct RenderPipeline {
    renderers: RendererRegistry,
    tool_ui: ToolUiRegistry,
}

impl RenderPipeline {
    /// An empty pipeline. Renders nothing until renderers are
    /// registered; mostly useful in tests.
    pub fn new() -> Self {
        RenderPipeline::default()
    }

    /// The pipeline with all built-in renderers and tool cards.
    pub fn with_defaults() -> Self {
        let mut pipeline = RenderPipeline::new();
        pipeline.register_renderer(text_renderer());
        pipeline.register_renderer(reasoning_renderer());
        pipeline.register_renderer(network_renderer());
        pipeline.register_renderer(tool_renderer());
        pipeline.register_renderer(dynamic_tool_renderer());
        pipeline.register_renderer(weather_renderer());
        pipeline.register_tool_ui(weather_card_registration());
        pipeline
    }

    pub fn register_renderer(&mut self, def: RendererDef) {
        self.renderers.register(def);
    }

    pub fn register_tool_ui(&mut self, registration: ToolUiRegistration) {
        self.tool_ui.register(registration);
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn tool_ui(&self) -> &ToolUiRegistry {
        &self.tool_ui
    }

    /// Render one part. `None` means the part is suppressed or
    /// unclaimed; malformed input renders less, never errors.
    pub fn render_part(&self, ctx: &RenderContext<'_>, part: &Part) -> Option<ViewBlock> {
        let def = self.renderers.resolve(self, part)?;
        (def.render)(self, ctx, part)
    }

    /// Render every part of a message, in array order.
    pub fn render_message(
        &self,
        message: &Message,
        status: ChatStatus,
        is_last_message: bool,
    ) -> Vec<ViewBlock> {
        let ctx = RenderContext {
            status,
            is_last_message,
            has_text_part: message.has_text_part(),
            all_parts: &message.parts,
        };
        message
            .parts
            .iter()
            .filter_map(|part| self.render_part(&ctx, part))
            .collect()
    }
}
