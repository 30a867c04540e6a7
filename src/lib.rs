//! inkscape-mcp - Inkscape automation and raster image filters for AI agents
//!
//! This library provides:
//! - Detection of an installed Inkscape and a bounded process wrapper for it
//! - Nine operation-multiplexed tools (vector, filter, color, transform,
//!   analysis, file, layer, batch, system) that always answer with a uniform
//!   JSON result envelope
//! - Native raster filters and a parallel batch orchestrator
//! - An MCP server exposing the tools over stdio (feature `mcp`)

pub mod cli;
pub mod config;
pub mod detector;
pub mod envelope;
pub mod error;
pub mod imaging;
pub mod logging;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod process;
pub mod svg;
pub mod tools;
