//! Routing agent
//!
//! Plans which tools answer a user query, executes the plan step by
//! step, and records the run as a `NetworkData` trace. Every mutation
//! of the trace is pushed through a snapshot callback so the engine can
//! stream partial traces to the UI while steps are still running.
//!
//! The planner/composer seam is `RoutingModel`. The built-in
//! `RuleRouter` is deterministic keyword routing; a model-backed
//! implementation slots in behind the same trait.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::message::{NetworkData, NetworkStatus, Step, StepStatus, Task, ToolInvocation};
use crate::tools::destinations::DESTINATIONS_TOOL;
use crate::tools::weather::WEATHER_TOOL;
use crate::tools::web_search::WEB_SEARCH_TOOL;
use crate::tools::ToolSet;

pub const NETWORK_NAME: &str = "travel-agent-network";

/// A tool the planner can route to, with its input.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteTarget {
    Weather { location: String },
    Destinations { query: String },
    WebSearch { query: String },
}

impl RouteTarget {
    pub fn tool_name(&self) -> &'static str {
        match self {
            RouteTarget::Weather { .. } => WEATHER_TOOL,
            RouteTarget::Destinations { .. } => DESTINATIONS_TOOL,
            RouteTarget::WebSearch { .. } => WEB_SEARCH_TOOL,
        }
    }

    fn input(&self) -> Value {
        match self {
            RouteTarget::Weather { location } => json!({ "location": location }),
            RouteTarget::Destinations { query } => json!({ "query": query }),
            RouteTarget::WebSearch { query } => json!({ "query": query }),
        }
    }
}

/// One planned step: a target plus the planner's stated reason.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedStep {
    pub target: RouteTarget,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutePlan {
    pub steps: Vec<PlannedStep>,
}

/// Planner/composer seam. `plan` decides which tools run; `compose`
/// turns the finished trace into the answer text.
#[async_trait]
pub trait RoutingModel: Send + Sync {
    async fn plan(&self, query: &str, web_search_enabled: bool) -> Result<RoutePlan>;
    async fn compose(&self, query: &str, trace: &NetworkData) -> Result<String>;
}

// ============================================================================
// Agent
// ============================================================================

pub struct RoutingAgent {
    tools: ToolSet,
    model: Arc<dyn RoutingModel>,
}

impl RoutingAgent {
    pub fn new(tools: ToolSet, model: Arc<dyn RoutingModel>) -> Self {
        RoutingAgent { tools, model }
    }

    /// Run the full plan for one query. `on_update` receives a snapshot
    /// after every trace mutation; the final trace is also returned.
    pub async fn run(
        &self,
        query: &str,
        web_search_enabled: bool,
        mut on_update: impl FnMut(&NetworkData) + Send,
    ) -> Result<NetworkData> {
        let plan = self.model.plan(query, web_search_enabled).await?;
        debug!(steps = plan.steps.len(), "Routing plan ready");

        let mut trace = NetworkData::new(NETWORK_NAME);
        trace.status = NetworkStatus::Running;
        for (index, planned) in plan.steps.iter().enumerate() {
            trace.steps.push(Step {
                id: format!("step-{}", index + 1),
                name: planned.target.tool_name().to_string(),
                status: StepStatus::Waiting,
                task: Some(Task {
                    id: planned.target.tool_name().to_string(),
                    task_type: "tool".to_string(),
                    reason: planned.reason.clone(),
                    ..Default::default()
                }),
                input: Some(planned.target.input()),
                output: None,
            });
        }
        on_update(&trace);

        for (index, planned) in plan.steps.iter().enumerate() {
            trace.steps[index].status = StepStatus::Running;
            on_update(&trace);

            match self.execute(&planned.target).await {
                Ok(output) => {
                    let step = &mut trace.steps[index];
                    step.status = StepStatus::Success;
                    if let Some(task) = step.task.as_mut() {
                        task.tool_results.push(ToolInvocation {
                            tool_name: planned.target.tool_name().to_string(),
                            result: output.clone(),
                        });
                    }
                    step.output = Some(output);
                }
                Err(error) => {
                    warn!(tool = planned.target.tool_name(), %error, "Routing step failed");
                    let step = &mut trace.steps[index];
                    step.status = StepStatus::Failed;
                    step.output = Some(json!({ "error": error.to_string() }));
                }
            }
            on_update(&trace);
        }

        let answer = self.model.compose(query, &trace).await?;
        trace.output = Some(Value::String(answer));
        trace.status = NetworkStatus::Finished;
        on_update(&trace);

        Ok(trace)
    }

    async fn execute(&self, target: &RouteTarget) -> Result<Value> {
        match target {
            RouteTarget::Weather { location } => {
                let report = self.tools.weather.current_weather(location).await?;
                Ok(serde_json::to_value(report)?)
            }
            RouteTarget::Destinations { query } => {
                let result = self.tools.destinations.search(query);
                Ok(serde_json::to_value(result)?)
            }
            RouteTarget::WebSearch { query } => {
                let search = self
                    .tools
                    .search
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Web search is not configured"))?;
                let results = search.search(query).await?;
                Ok(serde_json::to_value(results)?)
            }
        }
    }
}

// ============================================================================
// Rule-based default model
// ============================================================================

/// Deterministic keyword router. Used when no model backend is wired
/// up; also the workhorse for engine tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleRouter;

const WEATHER_KEYWORDS: &[&str] = &["weather", "temperature", "forecast", "rain", "sunny"];
const SEARCH_KEYWORDS: &[&str] = &["latest", "news", "current", "today", "events", "open"];

impl RuleRouter {
    fn weather_location(query: &str) -> String {
        // "weather in Rome" keeps "Rome"; otherwise the whole query is
        // handed to geocoding as-is.
        let lower = query.to_lowercase();
        if let Some(pos) = lower.rfind(" in ") {
            let location = query[pos + 4..].trim().trim_end_matches(['?', '.', '!']);
            if !location.is_empty() {
                return location.to_string();
            }
        }
        query.trim_end_matches(['?', '.', '!']).trim().to_string()
    }
}

#[async_trait]
impl RoutingModel for RuleRouter {
    async fn plan(&self, query: &str, web_search_enabled: bool) -> Result<RoutePlan> {
        let lower = query.to_lowercase();
        let mut steps = Vec::new();

        if WEATHER_KEYWORDS.iter().any(|k| lower.contains(k)) {
            steps.push(PlannedStep {
                target: RouteTarget::Weather {
                    location: Self::weather_location(query),
                },
                reason: "The question asks about current weather conditions.".to_string(),
            });
        }
        if web_search_enabled && SEARCH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            steps.push(PlannedStep {
                target: RouteTarget::WebSearch {
                    query: query.to_string(),
                },
                reason: "Up-to-date information is needed to answer this.".to_string(),
            });
        }
        if steps.is_empty() {
            steps.push(PlannedStep {
                target: RouteTarget::Destinations {
                    query: query.to_string(),
                },
                reason: "Matching the request against the destination catalog.".to_string(),
            });
        }

        Ok(RoutePlan { steps })
    }

    async fn compose(&self, _query: &str, trace: &NetworkData) -> Result<String> {
        let mut lines = Vec::new();
        for step in &trace.steps {
            if step.status != StepStatus::Success {
                continue;
            }
            let Some(output) = step.output.as_ref() else {
                continue;
            };
            match step.name.as_str() {
                WEATHER_TOOL => {
                    if let (Some(location), Some(temperature), Some(conditions)) = (
                        output.get("location").and_then(Value::as_str),
                        output.get("temperature").and_then(Value::as_f64),
                        output.get("conditions").and_then(Value::as_str),
                    ) {
                        lines.push(format!(
                            "Right now in {location} it is {temperature:.0}°C with {}.",
                            conditions.to_lowercase()
                        ));
                    }
                }
                DESTINATIONS_TOOL => {
                    let cities: Vec<&str> = output
                        .get("destinations")
                        .and_then(Value::as_array)
                        .map(|destinations| {
                            destinations
                                .iter()
                                .filter_map(|d| d.get("city").and_then(Value::as_str))
                                .collect()
                        })
                        .unwrap_or_default();
                    if !cities.is_empty() {
                        lines.push(format!("Worth considering: {}.", cities.join(", ")));
                    }
                }
                WEB_SEARCH_TOOL => {
                    if let Some(text) = output.get("text").and_then(Value::as_str) {
                        if !text.trim().is_empty() {
                            lines.push(text.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        if lines.is_empty() {
            return Ok(
                "I couldn't gather anything useful for that. Could you rephrase?".to_string(),
            );
        }
        Ok(lines.join("\n\n"))
    }
}
