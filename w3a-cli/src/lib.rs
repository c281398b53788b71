//! # w3a-cli
//!
//! Command-line entry points.
//!
//! - `web3-agent` starts the Web3 agent behind an A2A server
//! - `a2a-cli` is an interactive client for any A2A agent

pub mod cli;
pub mod console;
pub mod serve;

pub use cli::{AgentArgs, ClientArgs};
pub use console::run_client;
pub use serve::run_agent_server;
