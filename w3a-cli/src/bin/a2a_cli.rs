use clap::Parser;
use std::process::ExitCode;
use w3a_cli::{ClientArgs, run_client};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = ClientArgs::parse();
    if let Err(e) = w3a_telemetry::init_telemetry("a2a-cli") {
        eprintln!("Failed to initialize telemetry: {e}");
    }

    match run_client(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}
