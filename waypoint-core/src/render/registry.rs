//! Renderer registry
//!
//! An ordered collection of renderer definitions. Resolution picks the
//! single highest-priority definition whose predicate accepts the part;
//! ties go to the earliest registration. The registry holds no
//! per-message state and is populated once at startup.

use crate::message::Part;
use crate::render::pipeline::{RenderContext, RenderPipeline};
use crate::render::view::ViewBlock;

pub type CanRenderFn = fn(&RenderPipeline, &Part) -> bool;
pub type RenderFn = fn(&RenderPipeline, &RenderContext<'_>, &Part) -> Option<ViewBlock>;

/// Default priority for renderers that do not need to outrank anything.
pub const DEFAULT_PRIORITY: i32 = 0;

/// One renderer definition: which parts it claims and how it renders
/// them.
#[derive(Clone, Copy)]
pub struct RendererDef {
    /// Stable name, for diagnostics and tests.
    pub name: &'static str,
    pub priority: i32,
    pub can_render: CanRenderFn,
    pub render: RenderFn,
}

impl std::fmt::Debug for RendererDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererDef")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RendererRegistry {
    defs: Vec<RendererDef>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        RendererRegistry::default()
    }

    /// Append a renderer definition. Registration order is the tie-break
    /// for equal priorities: first registered wins.
    pub fn register(&mut self, def: RendererDef) {
        self.defs.push(def);
    }

    /// Pick the highest-priority definition that accepts `part`, or
    /// `None` if nothing claims it.
    pub fn resolve(&self, pipeline: &RenderPipeline, part: &Part) -> Option<&RendererDef> {
        let mut best: Option<&RendererDef> = None;
        for def in &self.defs {
            if !(def.can_render)(pipeline, part) {
                continue;
            }
            match best {
                Some(current) if current.priority >= def.priority => {}
                _ => best = Some(def),
            }
        }
        best
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
