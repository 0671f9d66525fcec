//! Network-data extraction
//!
//! Pure derivation of the renderable facts of one network trace. The
//! extractor keeps no state: streaming updates re-invoke it on the whole
//! `NetworkData` value, so the result is always consistent with the
//! current step array.

use serde_json::Value;

use crate::message::{NetworkData, SourceRecord};
use crate::sources::sources_from_step_output;

/// The structured view of a network execution: current reasoning text,
/// extracted sources, and the resolved output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NetworkView {
    pub reasoning: Option<String>,
    pub sources: Option<Vec<SourceRecord>>,
    pub has_output: bool,
    pub output: Option<String>,
}

/// Name of the step whose output carries web sources.
pub const WEB_SEARCH_STEP: &str = "web-search";

/// Render a JSON value as output text. Strings pass through; any other
/// non-null value is shown as its compact JSON encoding.
pub(crate) fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Derive `{reasoning, sources, has_output, output}` from one network
/// trace.
///
/// - `reasoning` is the first step's non-empty `task.reason`, in array
///   order.
/// - `sources` come from the `web-search` step's `output.sources`, if
///   that list is non-empty.
/// - `output` resolves by priority: the trace's own `output` when it
///   stringifies non-empty; otherwise the most recent step `output` that
///   trims non-empty (reverse scan); otherwise, in the same scan, the
///   most recent step's non-empty `task.text` (steps still streaming).
/// - `has_output` is true iff the resolved output is non-blank after
///   trimming.
pub fn extract_network_data(data: &NetworkData) -> NetworkView {
    let reasoning = data
        .steps
        .iter()
        .find_map(|step| {
            let reason = &step.task.as_ref()?.reason;
            (!reason.is_empty()).then(|| reason.clone())
        });

    let sources = data
        .steps
        .iter()
        .find(|step| step.name == WEB_SEARCH_STEP && step.output.is_some())
        .and_then(|step| sources_from_step_output(step.output.as_ref()?));

    // Trace-level output is authoritative; step-derived output is only a
    // fallback while the trace has none.
    let mut output = data.output.as_ref().and_then(stringify).filter(|s| !s.is_empty());

    if output.is_none() {
        for step in data.steps.iter().rev() {
            if let Some(step_output) = step.output.as_ref().and_then(stringify) {
                if !step_output.trim().is_empty() {
                    output = Some(step_output);
                    break;
                }
            }
            if let Some(task_text) = step.task.as_ref().and_then(|t| t.text.as_deref()) {
                if !task_text.trim().is_empty() {
                    output = Some(task_text.to_string());
                    break;
                }
            }
        }
    }

    let has_output = output
        .as_deref()
        .is_some_and(|text| !text.trim().is_empty());

    NetworkView {
        reasoning,
        sources,
        has_output,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Step, StepStatus, Task};
    use serde_json::json;

    fn step(name: &str) -> Step {
        Step {
            id: format!("step-{name}"),
            name: name.to_string(),
            status: StepStatus::Success,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_trace_extracts_nothing() {
        let data = NetworkData::new("routing-agent");
        let view = extract_network_data(&data);
        assert_eq!(
            view,
            NetworkView {
                reasoning: None,
                sources: None,
                has_output: false,
                output: None,
            }
        );
    }

    #[test]
    fn test_trace_output_wins_over_steps() {
        let mut data = NetworkData::new("routing-agent");
        data.output = Some(json!("Paris is lovely"));
        let mut s = step("destinations-search");
        s.output = Some(json!("Try Rome"));
        data.steps.push(s);

        let view = extract_network_data(&data);
        assert_eq!(view.output.as_deref(), Some("Paris is lovely"));
        assert!(view.has_output);
    }

    #[test]
    fn test_reverse_scan_picks_most_recent_step_output() {
        let mut data = NetworkData::new("routing-agent");
        let mut first = step("a");
        first.output = Some(json!("older answer"));
        let mut second = step("b");
        second.output = Some(json!("Try Rome"));
        let mut third = step("c");
        third.output = Some(json!("   "));
        data.steps.extend([first, second, third]);

        let view = extract_network_data(&data);
        assert_eq!(view.output.as_deref(), Some("Try Rome"));
    }

    #[test]
    fn test_task_text_covers_streaming_steps() {
        let mut data = NetworkData::new("routing-agent");
        let mut streaming = step("compose");
        streaming.status = StepStatus::Running;
        streaming.task = Some(Task {
            text: Some("partial answer".to_string()),
            ..Default::default()
        });
        data.steps.push(streaming);

        let view = extract_network_data(&data);
        assert_eq!(view.output.as_deref(), Some("partial answer"));
        assert!(view.has_output);
    }

    #[test]
    fn test_blank_trace_output_falls_through_but_stays_unresolved() {
        // Whitespace-only trace output stringifies non-empty, so it is
        // kept as the resolved output, but has_output stays false.
        let mut data = NetworkData::new("routing-agent");
        data.output = Some(json!("   "));
        let view = extract_network_data(&data);
        assert_eq!(view.output.as_deref(), Some("   "));
        assert!(!view.has_output);
    }

    #[test]
    fn test_reasoning_is_first_non_empty_task_reason() {
        let mut data = NetworkData::new("routing-agent");
        let mut silent = step("a");
        silent.task = Some(Task::default());
        let mut reasoned = step("b");
        reasoned.task = Some(Task {
            reason: "User asked about weather".to_string(),
            ..Default::default()
        });
        let mut later = step("c");
        later.task = Some(Task {
            reason: "second opinion".to_string(),
            ..Default::default()
        });
        data.steps.extend([silent, reasoned, later]);

        let view = extract_network_data(&data);
        assert_eq!(view.reasoning.as_deref(), Some("User asked about weather"));
    }

    #[test]
    fn test_sources_come_from_web_search_step_only() {
        let mut data = NetworkData::new("routing-agent");
        let mut other = step("destinations-search");
        other.output = Some(json!({ "sources": [{ "url": "https://x" }] }));
        let mut search = step(WEB_SEARCH_STEP);
        search.output = Some(json!({
            "sources": [{ "url": "https://a", "title": "A" }]
        }));
        data.steps.extend([other, search]);

        let view = extract_network_data(&data);
        let sources = view.sources.expect("sources");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://a");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let mut data = NetworkData::new("routing-agent");
        let mut s = step(WEB_SEARCH_STEP);
        s.output = Some(json!({
            "text": "cited [1]",
            "sources": [{ "url": "https://a" }]
        }));
        data.steps.push(s);
        data.output = Some(json!("done"));

        assert_eq!(extract_network_data(&data), extract_network_data(&data));
    }

    #[test]
    fn test_structured_step_output_renders_as_json() {
        let mut data = NetworkData::new("routing-agent");
        let mut s = step("get-weather");
        s.output = Some(json!({ "temperature": 18.0 }));
        data.steps.push(s);

        let view = extract_network_data(&data);
        assert_eq!(view.output.as_deref(), Some(r#"{"temperature":18.0}"#));
    }
}
