use clap::Parser;
use std::process::ExitCode;
use w3a_cli::{AgentArgs, run_agent_server};
use w3a_server::SetupError;
use w3a_telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // `.env` first so clap's env fallbacks see it.
    let _ = dotenvy::dotenv();
    let args = AgentArgs::parse();

    let telemetry = TelemetryConfig::from_env("web3-agent", |key| std::env::var(key).ok());
    if let Err(e) = w3a_telemetry::init(&telemetry) {
        eprintln!("Failed to initialize telemetry: {e}");
    }

    let code = match run_agent_server(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ SetupError::MissingApiKey(_)) => {
            tracing::error!("Error: {e}");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("An error occurred: {e}");
            ExitCode::from(1)
        }
    };
    w3a_telemetry::shutdown_telemetry();
    code
}
