// colloquy/src/tools/mod.rs

//! Tool trait, registry, and dispatcher.
//!
//! Tool failures are conversation content, not loop faults: a validation or
//! execution error becomes a tool-result message the backend can react to
//! on its next turn. Only an intent naming a tool absent from the registry
//! terminates the exchange.

pub mod code;
pub mod fs;
pub mod shell;

use crate::models::tools::{validate_arguments, ParametersSchema, ToolCallIntent, ToolDescriptor};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A named capability the backend may invoke.
///
/// Tools touching external resources carry no cross-invocation state
/// guarantee: a retried or fallback-triggered backend call may re-request
/// the same invocation, so each call must be independently safe to repeat.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> ParametersSchema;

    /// Executes the tool. Errors are stringified into the transcript by the
    /// dispatcher, never propagated as loop-level faults.
    async fn call(&self, arguments: Map<String, Value>) -> Result<String>;
}

/// Read-only map of tool name to implementation, built once at wiring time.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Replacing previously registered tool");
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Published descriptors for every registered tool, in name order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }
}

/// The dispatcher's verdict on one intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The named tool is not in the registry; the loop must stop this turn.
    Unavailable(String),
    /// A tool-result to feed back into the transcript; the loop continues.
    Feedback(String),
}

/// Validates and executes a [`ToolCallIntent`] against the registry.
pub async fn dispatch(registry: &ToolRegistry, intent: &ToolCallIntent) -> Dispatch {
    let tool = match registry.get(&intent.name) {
        Some(tool) => tool,
        None => {
            warn!(tool = %intent.name, "Backend requested a tool that is not registered");
            return Dispatch::Unavailable(format!(
                "Tool '{}' is not available in this conversation.",
                intent.name
            ));
        }
    };

    if let Err(problem) = validate_arguments(&tool.parameters(), &intent.arguments) {
        debug!(tool = %intent.name, problem = %problem, "Tool argument validation failed");
        return Dispatch::Feedback(format!(
            "Invalid arguments for tool '{}': {}",
            intent.name, problem
        ));
    }

    debug!(tool = %intent.name, "Executing tool");
    match tool.call(intent.arguments.clone()).await {
        Ok(output) => Dispatch::Feedback(output),
        Err(e) => {
            warn!(tool = %intent.name, error = ?e, "Tool execution failed");
            Dispatch::Feedback(format!("Error executing tool '{}': {}", intent.name, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tools::ParameterSpec;
    use anyhow::anyhow;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }
        fn description(&self) -> &str {
            "Echoes the 'x' argument"
        }
        fn parameters(&self) -> ParametersSchema {
            ParametersSchema::empty().with_property(
                "x",
                ParameterSpec::new(crate::models::tools::ParameterType::Integer, "value"),
                true,
            )
        }
        async fn call(&self, arguments: Map<String, Value>) -> Result<String> {
            Ok(arguments["x"].to_string())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "Boom"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn parameters(&self) -> ParametersSchema {
            ParametersSchema::empty()
        }
        async fn call(&self, _arguments: Map<String, Value>) -> Result<String> {
            Err(anyhow!("internal failure"))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(Arc::new(EchoTool))
            .with_tool(Arc::new(FailingTool))
    }

    fn intent(name: &str, args: Value) -> ToolCallIntent {
        ToolCallIntent {
            name: name.to_string(),
            arguments: args.as_object().unwrap().clone(),
        }
    }

    #[tokio::test]
    async fn dispatch_runs_known_tool() {
        let verdict = dispatch(&registry(), &intent("Echo", json!({"x": 1}))).await;
        assert_eq!(verdict, Dispatch::Feedback("1".to_string()));
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_tool() {
        let verdict = dispatch(&registry(), &intent("Foo", json!({}))).await;
        match verdict {
            Dispatch::Unavailable(msg) => assert!(msg.contains("Foo")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_feeds_back_validation_errors() {
        let verdict = dispatch(&registry(), &intent("Echo", json!({"x": "one"}))).await;
        match verdict {
            Dispatch::Feedback(msg) => {
                assert!(msg.contains("Invalid arguments"), "got: {}", msg);
                assert!(msg.contains("Echo"), "got: {}", msg);
            }
            other => panic!("expected Feedback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_feeds_back_execution_errors() {
        let verdict = dispatch(&registry(), &intent("Boom", json!({}))).await;
        match verdict {
            Dispatch::Feedback(msg) => assert!(msg.contains("internal failure"), "got: {}", msg),
            other => panic!("expected Feedback, got {:?}", other),
        }
    }

    #[test]
    fn descriptors_are_sorted_and_complete() {
        let descriptors = registry().descriptors();
        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Boom", "Echo"]);
    }
}
