//! Model Context Protocol surface for promptlog.
//!
//! [`McpServer`] speaks newline-delimited JSON-RPC 2.0 over stdio and exposes
//! the tools in [`ToolRegistry`], most importantly `save_prompt`.

mod dispatch;
mod error;
mod protocol;
mod server;
mod tools;

pub use dispatch::McpMethod;
pub use error::McpError;
pub use server::{McpServer, PROTOCOL_VERSION, SERVER_NAME};
pub use tools::{
    ConfigSource, ToolContent, ToolContext, ToolDefinition, ToolRegistry, ToolResult,
    render_save_result,
};
