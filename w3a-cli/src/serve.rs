use crate::cli::AgentArgs;
use w3a_server::{SetupError, setup_server};

/// Sets up the Web3 agent server from `args` and serves until Ctrl-C.
pub async fn run_agent_server(args: AgentArgs) -> Result<(), SetupError> {
    let settings = args.into_settings();
    tracing::debug!(?settings, "server settings");

    let server = setup_server(&settings).await?;
    tracing::info!(url = %settings.base_url(), "starting server");
    server.serve().await?;
    Ok(())
}
