//! # w3a-a2a
//!
//! Agent-to-Agent (A2A) protocol support: JSON-RPC over HTTP for exchanging tasks.
//!
//! - [`types`] holds the wire types ([`Task`], [`Message`], [`Part`], [`AgentCard`])
//! - [`A2aServer`] serves a [`TaskManager`] and the agent card
//! - [`A2aClient`] / [`A2aCardResolver`] talk to a remote agent

pub mod client;
pub mod error;
pub mod jsonrpc;
pub mod server;
pub mod task_manager;
pub mod types;
pub mod utils;

pub use client::{A2aCardResolver, A2aClient, TaskUpdateStream};
pub use error::{A2aClientError, ClientResult};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, codes, methods};
pub use server::{A2aServer, AGENT_CARD_PATH, DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT};
pub use task_manager::{InMemoryTaskStore, TaskEventStream, TaskManager, TaskResult};
pub use types::*;
pub use utils::are_modalities_compatible;
