//! MCP (Model Context Protocol) server for inkscape-mcp
//!
//! Exposes the five tool dispatchers as MCP tools over stdio. Each tool
//! returns the JSON result envelope as text content.
//!
//! Start the server with `inkscape-mcp serve` (feature-gated).

mod server;

pub use server::{run_server, InkscapeMcpServer};
