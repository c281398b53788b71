//! # w3a-agent
//!
//! Agent runtime for the Web3 agent.
//!
//! - [`LlmAgent`] alternates model turns and tool calls
//! - [`Runner`] runs an agent inside a stored [`Session`]
//! - [`Web3Agent`] is the blockchain agent served over A2A

pub mod context;
pub mod llm_agent;
pub mod runner;
pub mod session;
pub mod web3;

pub use context::RunContext;
pub use llm_agent::{DEFAULT_MAX_ITERATIONS, LlmAgent, LlmAgentBuilder};
pub use runner::{Runner, RunnerConfig};
pub use session::{
    CreateRequest, GetRequest, InMemorySessionService, Session, SessionKey, SessionService,
};
pub use web3::{QueryAgent, SUPPORTED_CONTENT_TYPES, Web3Agent, Web3AgentConfig};
