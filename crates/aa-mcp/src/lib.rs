//! # aa-mcp
//!
//! MCP tool interface for the ATT&CK knowledge graph: a JSON-RPC 2.0
//! dispatcher over line-delimited stdio. The dispatcher owns the
//! request/response envelope and notification semantics; the graph engine
//! in `aa-core` only ever sees typed arguments.

pub mod schemas;
pub mod server;
pub mod types;

pub use server::McpServer;
pub use types::{JsonRpcRequest, JsonRpcResponse, ToolCallResult};
