use clap::Parser;
use std::time::Duration;
use w3a_server::config::{DEFAULT_MCP_COMMAND, DEFAULT_MODEL, ServerSettings};
use w3a_server::{DEFAULT_HOST, DEFAULT_PORT};

pub const DEFAULT_AGENT_URL: &str = "http://localhost:12345";

/// Start the Web3 agent A2A server.
#[derive(Parser, Debug)]
#[command(name = "web3-agent", version, about, long_about = None)]
pub struct AgentArgs {
    /// Host address to bind the server to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to run the server on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "WEB3_AGENT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Program used to launch the MCP server
    #[arg(long, default_value = DEFAULT_MCP_COMMAND)]
    pub mcp_command: String,

    /// Entry point script of the MCP ethers server
    #[arg(long, env = "MCP_SERVER_PATH")]
    pub mcp_server_path: Option<String>,

    /// Extra argument for the MCP server (repeatable)
    #[arg(long = "mcp-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub mcp_args: Vec<String>,

    /// Only expose this MCP tool to the model (repeatable)
    #[arg(long = "mcp-tool", value_name = "NAME")]
    pub mcp_tools: Vec<String>,

    /// Private key loaded on the `Local` chain during warmup
    #[arg(long, env = "WEB3_AGENT_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Run the warmup prompts before accepting tasks
    #[arg(long)]
    pub warmup: bool,

    /// Seconds to wait for one agent reply
    #[arg(long, default_value_t = 45)]
    pub task_timeout_secs: u64,

    /// Seconds before an HTTP request is answered with 408
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Largest accepted JSON-RPC body in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,
}

impl AgentArgs {
    pub fn into_settings(self) -> ServerSettings {
        ServerSettings {
            host: self.host,
            port: self.port,
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            model: self.model,
            mcp_command: self.mcp_command,
            mcp_server_path: self.mcp_server_path.filter(|p| !p.trim().is_empty()),
            mcp_args: self.mcp_args,
            mcp_tools: self.mcp_tools,
            private_key: self.private_key.filter(|k| !k.trim().is_empty()),
            warmup: self.warmup,
            task_timeout: Duration::from_secs(self.task_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_size: self.max_body_bytes,
            ..ServerSettings::default()
        }
    }
}

/// Talk to an A2A agent from the terminal.
#[derive(Parser, Debug)]
#[command(name = "a2a-cli", version, about, long_about = None)]
pub struct ClientArgs {
    /// Base URL of the agent
    #[arg(long, default_value = DEFAULT_AGENT_URL)]
    pub agent: String,

    /// Session id to reuse; a new one is generated otherwise
    #[arg(long)]
    pub session: Option<String>,

    /// Print the task history after every exchange
    #[arg(long)]
    pub history: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn commands_are_well_formed() {
        AgentArgs::command().debug_assert();
        ClientArgs::command().debug_assert();
    }

    #[test]
    fn agent_defaults() {
        let args = AgentArgs::try_parse_from(["web3-agent"]).unwrap();
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 12345);
        assert_eq!(args.mcp_command, "node");
        assert!(!args.warmup);

        let settings = args.into_settings();
        assert_eq!(settings.base_url(), "http://localhost:12345/");
        assert_eq!(settings.task_timeout, Duration::from_secs(45));
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.max_body_size, 1024 * 1024);
        assert!(settings.mcp_tools.is_empty());
    }

    #[test]
    fn agent_flags() {
        let args = AgentArgs::try_parse_from([
            "web3-agent",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--mcp-server-path",
            "/opt/mcp/server.js",
            "--mcp-arg=--verbose",
            "--mcp-tool",
            "getBalance",
            "--mcp-tool",
            "getBlockNumber",
            "--request-timeout-secs",
            "30",
            "--max-body-bytes",
            "4096",
            "--warmup",
        ])
        .unwrap();
        let settings = args.into_settings();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.mcp_tools, vec!["getBalance", "getBlockNumber"]);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_body_size, 4096);
        assert!(settings.warmup);
        let params = settings.mcp_params().unwrap();
        assert_eq!(params.display_command(), "node /opt/mcp/server.js --verbose");
    }

    #[test]
    fn client_flags() {
        let args = ClientArgs::try_parse_from(["a2a-cli"]).unwrap();
        assert_eq!(args.agent, "http://localhost:12345");
        assert!(args.session.is_none());

        let argv = ["a2a-cli", "--agent", "http://h:1", "--session", "abc", "--history"];
        let args = ClientArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.agent, "http://h:1");
        assert_eq!(args.session.as_deref(), Some("abc"));
        assert!(args.history);
    }
}
