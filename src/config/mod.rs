//! Server configuration (`inkscape-mcp.toml`)

mod loader;
mod schema;

pub use loader::*;
pub use schema::*;
