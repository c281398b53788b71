// MCP (Model Context Protocol) toolset over stdio.
//
// The blockchain tools live in an external MCP server process; this module
// spawns it, lists its tools and proxies calls, respawning on transport loss.

mod params;
mod reconnect;
mod toolset;

pub use params::{ChildProcessFactory, DEFAULT_CONNECT_TIMEOUT, MCP_SERVER_PATH_ENV, McpServerParams};
pub use reconnect::{ConnectionFactory, RefreshConfig, should_refresh_connection};
pub use toolset::McpToolset;
