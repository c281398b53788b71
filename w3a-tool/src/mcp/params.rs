use super::reconnect::ConnectionFactory;
use rmcp::{RoleClient, ServiceExt, service::RunningService, transport::TokioChildProcess};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::process::Command;
use w3a_core::{Result, W3aError};

/// Environment variable holding the path of the MCP ethers server entry point.
pub const MCP_SERVER_PATH_ENV: &str = "MCP_SERVER_PATH";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to launch the MCP server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServerParams {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub connect_timeout: Duration,
}

impl McpServerParams {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// `node <script>`, the usual way to run the ethers MCP server.
    pub fn node(script: impl Into<String>) -> Self {
        Self::new("node").with_arg(script)
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args).envs(&self.env);
        cmd
    }

    /// Spawns the server and completes the MCP handshake within `connect_timeout`.
    pub async fn spawn(&self) -> Result<RunningService<RoleClient, ()>> {
        let transport = TokioChildProcess::new(self.command()).map_err(|e| {
            W3aError::Tool(format!("failed to spawn MCP server '{}': {e}", self.display_command()))
        })?;

        match tokio::time::timeout(self.connect_timeout, ().serve(transport)).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(e)) => Err(W3aError::Tool(format!("MCP handshake failed: {e}"))),
            Err(_) => Err(W3aError::Tool(format!(
                "MCP server did not respond within {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }
}

/// Reconnects by spawning a new server process from the same parameters.
#[derive(Debug, Clone)]
pub struct ChildProcessFactory {
    params: McpServerParams,
}

impl ChildProcessFactory {
    pub fn new(params: McpServerParams) -> Self {
        Self { params }
    }
}

#[async_trait::async_trait]
impl ConnectionFactory for ChildProcessFactory {
    async fn create_connection(&self) -> std::result::Result<RunningService<RoleClient, ()>, String> {
        self.params.spawn().await.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_node_params() {
        let params = McpServerParams::node("/opt/mcp/build/index.js")
            .with_args(["--network", "local"])
            .with_env("RPC_URL", "http://127.0.0.1:8545");
        assert_eq!(params.command, "node");
        assert_eq!(params.args, vec!["/opt/mcp/build/index.js", "--network", "local"]);
        assert_eq!(params.display_command(), "node /opt/mcp/build/index.js --network local");
        assert_eq!(params.env["RPC_URL"], "http://127.0.0.1:8545");
        assert_eq!(params.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[tokio::test]
    async fn spawn_reports_missing_binary() {
        let params = McpServerParams::new("/nonexistent/w3a-mcp-server")
            .with_connect_timeout(Duration::from_secs(2));
        match params.spawn().await {
            Ok(_) => panic!("spawning a missing binary should fail"),
            Err(err) => assert!(matches!(err, W3aError::Tool(_))),
        }
    }
}
