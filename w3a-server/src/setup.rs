use crate::agent_card::build_agent_card;
use crate::config::ServerSettings;
use crate::error::SetupError;
use crate::task_manager::AgentTaskManager;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use w3a_a2a::A2aServer;
use w3a_agent::{QueryAgent, Web3Agent};
use w3a_core::Toolset;
use w3a_model::GeminiModel;
use w3a_tool::McpToolset;

/// The A2A server together with the toolset it must release when it stops.
pub struct Web3Server {
    server: A2aServer,
    toolset: Arc<dyn Toolset>,
}

impl Web3Server {
    pub fn new(server: A2aServer, toolset: Arc<dyn Toolset>) -> Self {
        Self { server, toolset }
    }

    pub fn server(&self) -> &A2aServer {
        &self.server
    }

    /// Serves until Ctrl-C, then closes the toolset.
    pub async fn serve(self) -> std::io::Result<()> {
        let Self { server, toolset } = self;
        let result = server.serve().await;
        Self::close_toolset(&toolset).await;
        result
    }

    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self { server, toolset } = self;
        let result = server.serve_with_shutdown(listener, shutdown).await;
        Self::close_toolset(&toolset).await;
        result
    }

    async fn close_toolset(toolset: &Arc<dyn Toolset>) {
        tracing::info!(toolset = toolset.name(), "closing toolset");
        toolset.close().await;
    }
}

/// Connects the MCP tools, builds the Web3 agent and wraps it in a [`Web3Server`].
pub async fn setup_server(settings: &ServerSettings) -> Result<Web3Server, SetupError> {
    let api_key = settings.require_api_key()?;
    let params = settings.mcp_params()?;

    tracing::info!(command = %params.display_command(), "connecting MCP tools");
    let mut toolset = McpToolset::connect(params).await?.with_name("web3_tools");
    if !settings.mcp_tools.is_empty() {
        let names: Vec<&str> = settings.mcp_tools.iter().map(String::as_str).collect();
        toolset = toolset.with_tools(&names);
    }
    let toolset: Arc<dyn Toolset> = Arc::new(toolset);

    let agent = match build_agent(settings, api_key, toolset.clone()).await {
        Ok(agent) => agent,
        Err(e) => {
            toolset.close().await;
            return Err(e);
        }
    };

    if settings.warmup {
        warm_up(&agent, settings.warmup_timeout).await;
    }

    let server = build_server(settings, Arc::new(agent));
    tracing::info!(url = %settings.base_url(), "server setup complete");
    Ok(Web3Server::new(server, toolset))
}

async fn build_agent(
    settings: &ServerSettings,
    api_key: &str,
    toolset: Arc<dyn Toolset>,
) -> Result<Web3Agent, SetupError> {
    let model = GeminiModel::new(api_key, &settings.model)?;
    tracing::info!(model = %settings.model, "initializing Web3 agent");
    Ok(Web3Agent::initialize(Arc::new(model), toolset, settings.agent_config()).await?)
}

/// Runs the warmup prompts; failures only produce warnings.
pub async fn warm_up(agent: &Web3Agent, timeout: Duration) {
    tracing::info!("running agent warm-up commands");
    match tokio::time::timeout(timeout, agent.run_initialization_commands()).await {
        Ok(Ok(())) => tracing::info!("initialization commands completed"),
        Ok(Err(e)) => tracing::warn!(error = %e, "initialization commands failed, continuing"),
        Err(_) => tracing::warn!("initialization commands timed out, continuing"),
    }
}

/// Wires `agent` into a task manager and server using the address and timeouts in `settings`.
pub fn build_server<A: QueryAgent + 'static>(settings: &ServerSettings, agent: Arc<A>) -> A2aServer {
    let task_manager = AgentTaskManager::new(agent).with_timeout(settings.task_timeout);
    A2aServer::new(
        settings.host.clone(),
        settings.port,
        build_agent_card(settings.base_url()),
        Arc::new(task_manager),
    )
    .with_request_timeout(settings.request_timeout)
    .with_max_body_size(settings.max_body_size)
}
