use super::params::{ChildProcessFactory, McpServerParams};
use super::reconnect::{ConnectionFactory, RefreshConfig, should_retry_mcp_operation};
use crate::schema::{SchemaFixOptions, fix_schema};
use async_trait::async_trait;
use rmcp::{
    RoleClient,
    model::{CallToolRequestParams, CallToolResult, Tool as RawMcpTool},
    service::RunningService,
};
use serde_json::{Value, json};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, warn};
use w3a_core::{Result, Tool, ToolContext, Toolset, W3aError};

type ToolFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The live MCP client plus what is needed to replace it.
struct Connection {
    client: Mutex<RunningService<RoleClient, ()>>,
    factory: Option<Arc<dyn ConnectionFactory>>,
    refresh_config: RefreshConfig,
}

impl Connection {
    async fn refresh(&self) -> Result<bool> {
        let Some(factory) = self.factory.clone() else {
            return Ok(false);
        };
        let new_client = factory
            .create_connection()
            .await
            .map_err(|e| W3aError::Tool(format!("Failed to refresh MCP connection: {e}")))?;

        let mut client = self.client.lock().await;
        client.cancellation_token().cancel();
        *client = new_client;
        Ok(true)
    }

    /// Decides whether a failed operation gets another attempt, reconnecting first.
    async fn recover(&self, operation: &str, error: &str, attempt: u32) -> Result<bool> {
        if !should_retry_mcp_operation(error, attempt, &self.refresh_config, self.factory.is_some())
        {
            return Ok(false);
        }
        if self.refresh_config.log_reconnections {
            warn!(
                operation,
                attempt = attempt + 1,
                max_attempts = self.refresh_config.max_attempts,
                error,
                "MCP operation failed; reconnecting and retrying"
            );
        }
        if self.refresh_config.retry_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.refresh_config.retry_delay_ms))
                .await;
        }
        self.refresh().await
    }

    async fn list_tools(&self) -> Result<Vec<RawMcpTool>> {
        let mut attempt = 0u32;
        loop {
            let result = {
                let client = self.client.lock().await;
                client.list_all_tools().await.map_err(|e| e.to_string())
            };
            match result {
                Ok(tools) => return Ok(tools),
                Err(error) => {
                    if !self.recover("list_tools", &error, attempt).await? {
                        return Err(W3aError::Tool(format!("Failed to list MCP tools: {error}")));
                    }
                    attempt += 1;
                }
            }
        }
    }

    async fn call_tool(&self, params: CallToolRequestParams) -> Result<CallToolResult> {
        let mut attempt = 0u32;
        loop {
            let result = {
                let client = self.client.lock().await;
                client.call_tool(params.clone()).await.map_err(|e| e.to_string())
            };
            match result {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !self.recover("call_tool", &error, attempt).await? {
                        return Err(W3aError::Tool(format!(
                            "Failed to call MCP tool '{}': {error}",
                            params.name
                        )));
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Exposes the tools of one MCP server as [`Tool`]s with repaired schemas.
pub struct McpToolset {
    connection: Arc<Connection>,
    tool_filter: Option<ToolFilter>,
    name: String,
    schema_options: SchemaFixOptions,
}

impl McpToolset {
    /// Wraps an already initialized MCP client. Without a connection factory
    /// transport failures are returned instead of retried.
    pub fn new(client: RunningService<RoleClient, ()>) -> Self {
        Self::from_parts(client, None, RefreshConfig::default())
    }

    fn from_parts(
        client: RunningService<RoleClient, ()>,
        factory: Option<Arc<dyn ConnectionFactory>>,
        refresh_config: RefreshConfig,
    ) -> Self {
        Self {
            connection: Arc::new(Connection { client: Mutex::new(client), factory, refresh_config }),
            tool_filter: None,
            name: "mcp_toolset".to_string(),
            schema_options: SchemaFixOptions::default(),
        }
    }

    /// Spawns the server described by `params`; it is respawned on transport loss.
    pub async fn connect(params: McpServerParams) -> Result<Self> {
        Self::connect_with(params, SchemaFixOptions::default(), RefreshConfig::default()).await
    }

    pub async fn connect_with(
        params: McpServerParams,
        schema_options: SchemaFixOptions,
        refresh_config: RefreshConfig,
    ) -> Result<Self> {
        info!(command = %params.display_command(), "Connecting to MCP server");
        let client = params.spawn().await?;
        let factory: Arc<dyn ConnectionFactory> = Arc::new(ChildProcessFactory::new(params));
        let mut toolset = Self::from_parts(client, Some(factory), refresh_config);
        toolset.schema_options = schema_options;
        Ok(toolset)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Only expose the named tools.
    pub fn with_tools(mut self, tool_names: &[&str]) -> Self {
        self.tool_filter = Some(allow_list(tool_names));
        self
    }

    /// Stops the MCP server process.
    pub async fn shutdown(&self) {
        let client = self.connection.client.lock().await;
        client.cancellation_token().cancel();
        info!(toolset = %self.name, "MCP client cancelled");
    }

    fn wrap(&self, raw: RawMcpTool) -> McpTool {
        let name = raw.name.to_string();
        let mut schema = Value::Object(raw.input_schema.as_ref().clone());
        let report = fix_schema(&mut schema, &self.schema_options);
        if !report.is_empty() {
            debug!(tool = %name, fixes = report.len(), "Repaired MCP tool schema");
        }
        let output_schema = raw.output_schema.map(|s| {
            let mut schema = Value::Object(s.as_ref().clone());
            fix_schema(&mut schema, &self.schema_options);
            schema
        });

        McpTool {
            name,
            description: raw.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: schema,
            output_schema,
            connection: self.connection.clone(),
        }
    }
}

#[async_trait]
impl Toolset for McpToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let raw_tools = self.connection.list_tools().await?;
        let tools: Vec<Arc<dyn Tool>> = raw_tools
            .into_iter()
            .filter(|t| self.tool_filter.as_ref().is_none_or(|filter| filter(&*t.name)))
            .map(|t| Arc::new(self.wrap(t)) as Arc<dyn Tool>)
            .collect();
        info!(toolset = %self.name, count = tools.len(), "Loaded MCP tools");
        Ok(tools)
    }

    async fn close(&self) {
        self.shutdown().await;
    }
}

struct McpTool {
    name: String,
    description: String,
    input_schema: Value,
    output_schema: Option<Value>,
    connection: Arc<Connection>,
}

fn allow_list(tool_names: &[&str]) -> ToolFilter {
    let names: Vec<String> = tool_names.iter().map(|s| s.to_string()).collect();
    Arc::new(move |name| names.iter().any(|n| n == name))
}

/// Turns tool arguments into MCP call arguments; `null` and `{}` mean none.
fn call_arguments(args: Value) -> Result<Option<serde_json::Map<String, Value>>> {
    match args {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        _ => Err(W3aError::Tool("Tool arguments must be an object".to_string())),
    }
}

/// Normalizes an MCP call result to `{"output": ...}`.
fn tool_output(
    tool: &str,
    is_error: bool,
    structured: Option<Value>,
    texts: Vec<String>,
) -> Result<Value> {
    if is_error {
        let mut message = format!("MCP tool '{tool}' execution failed");
        if let Some(first) = texts.first() {
            message.push_str(": ");
            message.push_str(first);
        }
        return Err(W3aError::Tool(message));
    }
    if let Some(structured) = structured {
        return Ok(json!({ "output": structured }));
    }
    if texts.is_empty() {
        return Err(W3aError::Tool(format!("MCP tool '{tool}' returned no content")));
    }
    Ok(json!({ "output": texts.join("\n") }))
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(self.input_schema.clone())
    }

    fn response_schema(&self) -> Option<Value> {
        self.output_schema.clone()
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
        let mut params = CallToolRequestParams::new(self.name.clone());
        params.arguments = call_arguments(args)?;
        let span = w3a_telemetry::tool_execute_span(&self.name);
        let result = self.connection.call_tool(params).instrument(span).await?;

        let texts: Vec<String> = result
            .content
            .iter()
            .map(|content| match content.deref().as_text() {
                Some(text) => text.text.clone(),
                None => "[non-text content]".to_string(),
            })
            .collect();
        tool_output(&self.name, result.is_error.unwrap_or(false), result.structured_content, texts)
    }
}
