use crate::error::SetupError;
use std::time::Duration;
use w3a_a2a::{DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT};
use w3a_agent::Web3AgentConfig;
pub use w3a_model::DEFAULT_MODEL;
use w3a_tool::{McpServerParams, validate_model_api_key};
use w3a_tool::mcp::{DEFAULT_CONNECT_TIMEOUT, MCP_SERVER_PATH_ENV};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 12345;
pub const API_KEY_ENV: &str = w3a_tool::MODEL_API_KEY_ENV;
pub const PRIVATE_KEY_ENV: &str = "WEB3_AGENT_PRIVATE_KEY";
pub const DEFAULT_MCP_COMMAND: &str = "node";
/// Budget for one agent invocation; blockchain calls can be slow.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEFAULT_WARMUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything needed to bring up the Web3 agent server.
#[derive(Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub model: String,
    pub mcp_command: String,
    /// Entry point of the MCP ethers server, passed as the first argument.
    pub mcp_server_path: Option<String>,
    pub mcp_args: Vec<String>,
    /// Tool names to expose; empty exposes every MCP tool.
    pub mcp_tools: Vec<String>,
    pub tool_connect_timeout: Duration,
    pub private_key: Option<String>,
    pub warmup: bool,
    pub warmup_timeout: Duration,
    pub task_timeout: Duration,
    pub request_timeout: Duration,
    pub max_body_size: usize,
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("mcp_command", &self.mcp_command)
            .field("mcp_server_path", &self.mcp_server_path)
            .field("mcp_args", &self.mcp_args)
            .field("mcp_tools", &self.mcp_tools)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("warmup", &self.warmup)
            .field("task_timeout", &self.task_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            mcp_command: DEFAULT_MCP_COMMAND.to_string(),
            mcp_server_path: None,
            mcp_args: Vec::new(),
            mcp_tools: Vec::new(),
            tool_connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            private_key: None,
            warmup: false,
            warmup_timeout: DEFAULT_WARMUP_TIMEOUT,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with secrets and the MCP script path read through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key: non_blank(lookup(API_KEY_ENV)),
            mcp_server_path: non_blank(lookup(MCP_SERVER_PATH_ENV)),
            private_key: non_blank(lookup(PRIVATE_KEY_ENV)),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_mcp_server_path(mut self, path: impl Into<String>) -> Self {
        self.mcp_server_path = Some(path.into());
        self
    }

    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn with_warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_mcp_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mcp_tools = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// URL published in the agent card.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// The API key; a missing one is an error, an implausible one only a warning.
    pub fn require_api_key(&self) -> Result<&str, SetupError> {
        let key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(SetupError::missing_api_key)?;
        validate_model_api_key(API_KEY_ENV, |_| Some(key.to_string()));
        Ok(key)
    }

    pub fn mcp_params(&self) -> Result<McpServerParams, SetupError> {
        if self.mcp_server_path.is_none() && self.mcp_args.is_empty() {
            return Err(SetupError::MissingMcpServer);
        }
        Ok(McpServerParams::new(&self.mcp_command)
            .with_args(self.mcp_server_path.iter().cloned())
            .with_args(self.mcp_args.iter().cloned())
            .with_connect_timeout(self.tool_connect_timeout))
    }

    pub fn agent_config(&self) -> Web3AgentConfig {
        match &self.private_key {
            Some(key) => Web3AgentConfig::new().with_private_key(key),
            None => Web3AgentConfig::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.base_url(), "http://localhost:12345/");
        assert_eq!(settings.model, "gemini-2.0-flash-001");
        assert_eq!(settings.task_timeout, Duration::from_secs(45));
        assert!(!settings.warmup);
        assert!(settings.agent_config().init_commands.is_empty());
        assert!(settings.mcp_tools.is_empty());
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.max_body_size, 1024 * 1024);
    }

    #[test]
    fn short_api_key_is_still_accepted() {
        let settings = ServerSettings::new().with_api_key("abc");
        assert_eq!(settings.require_api_key().unwrap(), "abc");
    }

    #[test]
    fn reads_environment_through_lookup() {
        let settings = ServerSettings::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "key-1234567890abcdefghij"),
            ("MCP_SERVER_PATH", "/opt/mcp/build/src/mcpServer.js"),
            ("WEB3_AGENT_PRIVATE_KEY", "0xabc"),
        ]));
        assert_eq!(settings.require_api_key().unwrap(), "key-1234567890abcdefghij");
        let params = settings.mcp_params().unwrap();
        assert_eq!(params.display_command(), "node /opt/mcp/build/src/mcpServer.js");
        assert_eq!(settings.agent_config().init_commands.len(), 3);
    }

    #[test]
    fn blank_api_key_is_missing() {
        let settings = ServerSettings::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")]));
        let err = settings.require_api_key().unwrap_err();
        assert_eq!(err.to_string(), "GOOGLE_API_KEY environment variable not set.");
        assert!(matches!(settings.mcp_params(), Err(SetupError::MissingMcpServer)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let settings = ServerSettings::new().with_api_key("secret-key").with_private_key("0xkey");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(!rendered.contains("0xkey"));
    }
}
