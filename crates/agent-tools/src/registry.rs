//! Tool registry for managing and executing tools.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Registry for managing tools.
///
/// The registry holds a collection of tools in registration order and
/// dispatches execution requests to the appropriate tool by name.
pub struct ToolRegistry {
    /// Registered tools by name.
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_boxed(Arc::new(tool));
    }

    /// Register a shared tool.
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// Get a list of registered tool names.
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool descriptions for help text.
    pub fn get_descriptions(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// Checks the call context and required parameters, then runs the tool
    /// within its execution budget.
    pub async fn execute(&self, name: &str, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        if tool.requires_call() {
            args.require_call(name)?;
        }
        for param in tool.parameters().iter().filter(|p| p.required) {
            if !args.params.contains_key(param.name) {
                return Err(ToolError::MissingParameter(param.name.to_string()));
            }
        }

        debug!("Executing tool '{}' with {} params", name, args.params.len());

        let budget = tool.max_execution_time();
        let result = timeout(budget, tool.execute(args))
            .await
            .map_err(|_| ToolError::TimedOut {
                tool: name.to_string(),
                after: budget,
            })??;

        debug!(
            "Tool '{}' completed: status={}, message_len={}",
            name,
            result.status,
            result.message.len()
        );

        Ok(result)
    }

    /// Execute a tool and fold every error into an `error` output.
    ///
    /// This is the boundary exposed to the conversation layer: it never
    /// returns an `Err`.
    pub async fn dispatch(&self, name: &str, args: ToolArgs) -> ToolOutput {
        match self.execute(name, args).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                ToolOutput::error(e.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
