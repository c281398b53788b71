use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Option<Value> {
        None
    }
    fn response_schema(&self) -> Option<Value> {
        None
    }
    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
}

pub trait ToolContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn function_call_id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn session_id(&self) -> &str;
}

#[async_trait]
pub trait Toolset: Send + Sync {
    fn name(&self) -> &str;
    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>>;

    /// Releases whatever backs the tools, such as a server process.
    async fn close(&self) {}
}

/// Builds the function declaration the model sees for `tool`.
pub fn function_declaration(tool: &dyn Tool) -> Value {
    let mut decl = serde_json::json!({
        "name": tool.name(),
        "description": tool.description(),
    });
    if let Some(params) = tool.parameters_schema() {
        decl["parameters"] = params;
    }
    if let Some(response) = tool.response_schema() {
        decl["response"] = response;
    }
    decl
}
