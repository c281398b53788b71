use thiserror::Error;
use w3a_core::W3aError;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{0}")]
    MissingApiKey(String),

    #[error("MCP server script is not configured; set MCP_SERVER_PATH or pass --mcp-server-path")]
    MissingMcpServer,

    #[error("{0}")]
    Agent(#[from] W3aError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SetupError {
    pub fn missing_api_key() -> Self {
        SetupError::MissingApiKey("GOOGLE_API_KEY environment variable not set.".to_string())
    }
}
