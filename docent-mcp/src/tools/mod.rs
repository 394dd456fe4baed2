//! Tools an answering model can call, dispatched by name.
//!
//! Each tool declares a JSON Schema for its input. The registry validates
//! arguments against the tool's typed input before the tool runs, so a tool
//! body only ever sees well-formed requests.

pub mod search_knowledge_base;

use async_trait::async_trait;
use rmcp::schemars::{self, JsonSchema};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("Invalid input for {tool}: {message}")]
    InvalidInput { tool: String, message: String },
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema describing the accepted arguments.
    fn input_schema(&self) -> serde_json::Value;

    /// Run the tool. Errors are reserved for arguments that fail validation;
    /// failures inside the tool are reported in the returned text.
    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError>;
}

/// Decode `args` into a tool's typed input.
pub fn parse_input<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// JSON Schema for a tool input type.
pub fn schema_for<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Summary of a registered tool, as presented to a model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous holder.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!("Tool {} registered twice; keeping the latest", name);
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;
        tracing::debug!("Invoking tool {}", name);
        tool.call(args).await
    }
}
