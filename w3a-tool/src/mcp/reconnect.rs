use rmcp::{RoleClient, service::RunningService};

/// Error fragments meaning the MCP session is gone and a fresh process may help.
const DEAD_SESSION_HINTS: [&str; 8] = [
    "connection closed",
    "connectionclosed",
    "eof",
    "closed pipe",
    "broken pipe",
    "session not found",
    "transport error",
    "connection reset",
];

pub fn should_refresh_connection(error: &str) -> bool {
    let error = error.to_lowercase();
    DEAD_SESSION_HINTS.iter().any(|hint| error.contains(hint))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Reconnections allowed per operation.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub log_reconnections: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { max_attempts: 3, retry_delay_ms: 1000, log_reconnections: true }
    }
}

impl RefreshConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.log_reconnections = false;
        self
    }
}

/// Creates fresh MCP client connections for reconnection.
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn create_connection(&self) -> Result<RunningService<RoleClient, ()>, String>;
}

pub(crate) fn should_retry_mcp_operation(
    error: &str,
    attempt: u32,
    refresh_config: &RefreshConfig,
    has_connection_factory: bool,
) -> bool {
    has_connection_factory
        && attempt < refresh_config.max_attempts
        && should_refresh_connection(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_transport_failures() {
        assert!(should_refresh_connection("Transport error: broken pipe"));
        assert!(should_refresh_connection("unexpected EOF while reading"));
        assert!(should_refresh_connection("ConnectionClosed"));
        assert!(should_refresh_connection("connection reset by peer"));
        assert!(!should_refresh_connection("invalid params: address is required"));
    }

    #[test]
    fn retry_requires_factory_and_budget() {
        let config = RefreshConfig::default().with_max_attempts(2);
        assert!(should_retry_mcp_operation("EOF", 0, &config, true));
        assert!(should_retry_mcp_operation("EOF", 1, &config, true));
        assert!(!should_retry_mcp_operation("EOF", 2, &config, true));
        assert!(!should_retry_mcp_operation("EOF", 0, &config, false));
        assert!(!should_retry_mcp_operation("insufficient funds", 0, &config, true));
    }

    #[test]
    fn config_builders() {
        let config = RefreshConfig::default().with_retry_delay_ms(0).without_logging();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_delay_ms, 0);
        assert!(!config.log_reconnections);
    }
}
