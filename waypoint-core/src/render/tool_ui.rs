//! Tool-UI registry
//!
//! Maps tool identifiers to specialized view constructors so specific
//! tools (e.g. weather) can bypass the generic tool-call view. A
//! registration covers one or more tool ids and guards itself with an
//! output validator; invalid output falls back to the generic view.

use std::collections::HashMap;

use serde_json::Value;

use crate::render::view::ViewBlock;

pub type ValidateFn = fn(&Value) -> bool;
pub type BuildViewFn = fn(&Value) -> Option<ViewBlock>;

/// A specialized view for one or more tool ids.
#[derive(Clone, Copy)]
pub struct ToolUiRegistration {
    /// Tool ids this view handles (a tool may be known under several).
    pub tool_ids: &'static [&'static str],
    /// Builds the specialized view from validated output.
    pub build: BuildViewFn,
    /// Validates the output shape before the view is built.
    pub is_valid_output: ValidateFn,
}

#[derive(Clone, Copy)]
struct Entry {
    build: BuildViewFn,
    is_valid_output: ValidateFn,
}

#[derive(Default)]
pub struct ToolUiRegistry {
    entries: HashMap<String, Entry>,
}

impl ToolUiRegistry {
    pub fn new() -> Self {
        ToolUiRegistry::default()
    }

    /// Register a specialized view. Later registrations for the same id
    /// overwrite earlier ones.
    pub fn register(&mut self, registration: ToolUiRegistration) {
        for id in registration.tool_ids {
            self.entries.insert(
                (*id).to_string(),
                Entry {
                    build: registration.build,
                    is_valid_output: registration.is_valid_output,
                },
            );
        }
    }

    /// Build the specialized view for `tool_name`, but only if a
    /// registration exists and the output validates.
    pub fn build_view(&self, tool_name: &str, output: &Value) -> Option<ViewBlock> {
        let entry = self.entries.get(tool_name)?;
        if !(entry.is_valid_output)(output) {
            return None;
        }
        (entry.build)(output)
    }

    /// Pure existence check, used by renderers to decide whether to
    /// defer to a specialized view.
    pub fn has_custom_ui(&self, tool_name: &str) -> bool {
        self.entries.contains_key(tool_name)
    }

    pub fn registered_tool_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}
