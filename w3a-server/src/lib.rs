//! # w3a-server
//!
//! Hosts the [`Web3Agent`](w3a_agent::Web3Agent) behind an A2A JSON-RPC endpoint.
//!
//! ```rust,ignore
//! use w3a_server::{ServerSettings, setup_server};
//!
//! let settings = ServerSettings::from_lookup(|key| std::env::var(key).ok());
//! let server = setup_server(&settings).await?;
//! server.serve().await?;
//! ```

pub mod agent_card;
pub mod config;
pub mod error;
pub mod setup;
pub mod task_manager;

pub use agent_card::build_agent_card;
pub use config::{DEFAULT_HOST, DEFAULT_PORT, ServerSettings};
pub use error::SetupError;
pub use setup::{Web3Server, build_server, setup_server, warm_up};
pub use task_manager::{AgentTaskManager, MISSING_INFO_MARKER};
