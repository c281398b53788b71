//! # w3a-core
//!
//! Core traits and types shared by every Web3 agent crate.
//!
//! - [`Agent`] runs against an [`InvocationContext`] and yields [`Event`]s
//! - [`Llm`] generates [`LlmResponse`]s from an [`LlmRequest`]
//! - [`Tool`] / [`Toolset`] expose callable capabilities to the model
//! - [`W3aError`] / [`Result`] unify error handling

pub mod agent;
pub mod error;
pub mod event;
pub mod model;
pub mod tool;
pub mod types;

pub use agent::{Agent, EventStream, InvocationContext};
pub use error::{Result, W3aError};
pub use event::Event;
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::{Tool, ToolContext, Toolset, function_declaration};
pub use types::{Content, FunctionResponseData, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER};
