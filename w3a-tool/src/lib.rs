//! # w3a-tool
//!
//! Blockchain tools for the Web3 agent, served by an external MCP server.
//!
//! The MCP server is spawned as a child process and spoken to over stdio.
//! Every tool schema it advertises is repaired by [`fix_schema`] before the
//! model sees it, since Gemini rejects type unions and untyped arrays.
//!
//! ```rust,ignore
//! use w3a_tool::{McpServerParams, McpToolset};
//!
//! let params = McpServerParams::node("/opt/mcp-ethers/build/index.js");
//! let toolset = McpToolset::connect(params).await?;
//! let tools = toolset.tools().await?;
//! ```

pub mod mcp;
pub mod schema;

pub use mcp::{
    ChildProcessFactory, ConnectionFactory, McpServerParams, McpToolset, RefreshConfig,
    should_refresh_connection,
};
pub use schema::{
    MODEL_API_KEY_ENV, SchemaFix, SchemaFixKind, SchemaFixOptions, SchemaFixReport, fix_schema,
    validate_model_api_key,
};
