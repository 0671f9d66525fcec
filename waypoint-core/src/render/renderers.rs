//! Built-in renderer definitions
//!
//! One definition per part family. Precedence within a part is encoded
//! here; precedence across definitions is the registry's priority order:
//! text/reasoning/tool/dynamic-tool at the default priority, network at
//! 15, weather at 50 so it outranks the generic tool view whenever the
//! tool has a registered card.

use crate::message::{ChatStatus, ChildMessage, Part, ToolState};
use crate::network::extract_network_data;
use crate::render::pipeline::{RenderContext, RenderPipeline};
use crate::render::registry::{RendererDef, DEFAULT_PRIORITY};
use crate::render::tool_ui::ToolUiRegistration;
use crate::render::view::ViewBlock;
use crate::sources::{has_citations, sources_from_parts, sources_from_step_output, split_citations};
use crate::tools::weather;
// The web-search tool's raw text is internal context: only its sources
// render.
use crate::tools::web_search::WEB_SEARCH_TOOL;

pub const NETWORK_PRIORITY: i32 = 15;
pub const WEATHER_PRIORITY: i32 = 50;

// ============================================================================
// Text
// ============================================================================

pub fn text_renderer() -> RendererDef {
    RendererDef {
        name: "text",
        priority: DEFAULT_PRIORITY,
        can_render: |_, part| matches!(part, Part::Text { .. }),
        render: render_text,
    }
}

fn render_text(
    _pipeline: &RenderPipeline,
    ctx: &RenderContext<'_>,
    part: &Part,
) -> Option<ViewBlock> {
    let Part::Text { text } = part else {
        return None;
    };
    if text.trim().is_empty() {
        return None;
    }

    // While the last message streams, the network's extracted reasoning
    // is already on screen via the reasoning view; an identical text
    // part would show it twice.
    if ctx.status == ChatStatus::Streaming && ctx.is_last_message {
        let duplicate = ctx
            .all_parts
            .iter()
            .find_map(|p| match p {
                Part::Network { data } => extract_network_data(data).reasoning,
                _ => None,
            })
            .is_some_and(|reasoning| reasoning == *text);
        if duplicate {
            return None;
        }
    }

    if has_citations(text) {
        if let Some(sources) = sources_from_parts(ctx.all_parts) {
            let segments = split_citations(text, &sources);
            return ViewBlock::stack(vec![
                ViewBlock::Response { segments },
                ViewBlock::Sources { sources },
            ]);
        }
    }

    Some(ViewBlock::plain_response(text.clone()))
}

// ============================================================================
// Reasoning
// ============================================================================

pub fn reasoning_renderer() -> RendererDef {
    RendererDef {
        name: "reasoning",
        priority: DEFAULT_PRIORITY,
        can_render: |_, part| matches!(part, Part::Reasoning { .. }),
        render: |_, ctx, part| {
            let Part::Reasoning { text } = part else {
                return None;
            };
            // Transient by design: history replay must not re-show it.
            if ctx.status != ChatStatus::Streaming || !ctx.is_last_message {
                return None;
            }
            Some(ViewBlock::Reasoning {
                text: text.clone(),
                streaming: true,
            })
        },
    }
}

// ============================================================================
// Network trace
// ============================================================================

pub fn network_renderer() -> RendererDef {
    RendererDef {
        name: "network",
        priority: NETWORK_PRIORITY,
        can_render: |_, part| matches!(part, Part::Network { .. }),
        render: render_network,
    }
}

fn render_network(
    pipeline: &RenderPipeline,
    ctx: &RenderContext<'_>,
    part: &Part,
) -> Option<ViewBlock> {
    let Part::Network { data } = part else {
        return None;
    };
    let view = extract_network_data(data);
    let streaming = ctx.status == ChatStatus::Streaming;

    let mut blocks = Vec::new();
    if let Some(reasoning) = &view.reasoning {
        blocks.push(ViewBlock::Reasoning {
            text: reasoning.clone(),
            streaming,
        });
    }

    // Specialized cards for any step-nested tool result whose tool has a
    // registered view.
    for step in &data.steps {
        let Some(task) = &step.task else { continue };
        for invocation in &task.tool_results {
            if let Some(card) = pipeline
                .tool_ui()
                .build_view(&invocation.tool_name, &invocation.result)
            {
                blocks.push(card);
            }
        }
    }

    blocks.push(ViewBlock::NetworkTrace {
        data: data.clone(),
        streaming,
    });

    if let Some(sources) = view.sources.clone() {
        blocks.push(ViewBlock::Sources { sources });
    }

    // Synthesized fallback: the trace finished without a separate text
    // part carrying the answer, so the resolved output is shown here.
    let fallback = !ctx.has_text_part
        && ctx.status == ChatStatus::Ready
        && ctx.is_last_message
        && view.has_output;
    if fallback {
        if let Some(output) = view.output {
            blocks.push(ViewBlock::plain_response(output));
        }
    }

    ViewBlock::stack(blocks)
}

// ============================================================================
// Generic tool
// ============================================================================

pub fn tool_renderer() -> RendererDef {
    RendererDef {
        name: "tool",
        priority: DEFAULT_PRIORITY,
        can_render: |_, part| matches!(part, Part::Tool(_)),
        render: |_, _, part| {
            let Part::Tool(tool) = part else {
                return None;
            };
            // Web-search output text carries bracket citations meant for
            // the routing agent, not the user: render sources only.
            if tool.name == WEB_SEARCH_TOOL {
                let sources = tool.output.as_ref().and_then(sources_from_step_output)?;
                return Some(ViewBlock::Sources { sources });
            }
            Some(ViewBlock::ToolCall {
                name: tool.name.clone(),
                state: tool.state,
                input: tool.input.clone(),
                output: tool.output.clone(),
                error_text: tool.error_text.clone(),
            })
        },
    }
}

// ============================================================================
// Dynamic tool (history replay)
// ============================================================================

pub fn dynamic_tool_renderer() -> RendererDef {
    RendererDef {
        name: "dynamic-tool",
        priority: DEFAULT_PRIORITY,
        can_render: |_, part| matches!(part, Part::DynamicTool(_)),
        render: render_dynamic_tool,
    }
}

fn render_dynamic_tool(
    _pipeline: &RenderPipeline,
    _ctx: &RenderContext<'_>,
    part: &Part,
) -> Option<ViewBlock> {
    let Part::DynamicTool(dynamic) = part else {
        return None;
    };

    let mut blocks = Vec::new();
    for child in &dynamic.output.child_messages {
        match child {
            ChildMessage::Tool {
                tool_name,
                args,
                tool_output,
                ..
            } => {
                let name = tool_name.clone().unwrap_or_else(|| "tool".to_string());
                if name == WEB_SEARCH_TOOL {
                    if let Some(sources) =
                        tool_output.as_ref().and_then(sources_from_step_output)
                    {
                        blocks.push(ViewBlock::Sources { sources });
                    }
                } else {
                    blocks.push(ViewBlock::ToolCall {
                        name,
                        state: ToolState::OutputAvailable,
                        input: args.clone(),
                        output: tool_output.clone(),
                        error_text: None,
                    });
                }
            }
            ChildMessage::Text { content } => {
                if let Some(content) = content.as_deref().filter(|c| !c.is_empty()) {
                    blocks.push(ViewBlock::plain_response(content));
                }
            }
        }
    }

    ViewBlock::stack(blocks)
}

// ============================================================================
// Weather
// ============================================================================

pub fn weather_renderer() -> RendererDef {
    RendererDef {
        name: "weather",
        priority: WEATHER_PRIORITY,
        can_render: |pipeline, part| {
            matches!(part, Part::Tool(tool) if pipeline.tool_ui().has_custom_ui(&tool.name))
        },
        render: |pipeline, _, part| {
            let Part::Tool(tool) = part else {
                return None;
            };
            let output = tool.output.as_ref()?;
            pipeline.tool_ui().build_view(&tool.name, output)
        },
    }
}

/// The default weather-card registration: both ids the transport has
/// used for the weather tool, guarded by the report-shape validator.
pub fn weather_card_registration() -> ToolUiRegistration {
    ToolUiRegistration {
        tool_ids: &[weather::WEATHER_TOOL, "weatherTool"],
        build: |output| weather::WeatherReport::from_output(output).map(ViewBlock::Weather),
        is_valid_output: weather::is_weather_report,
    }
}
