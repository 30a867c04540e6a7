//! inkscape-mcp - MCP server and command-line front end

use std::process::ExitCode;

use inkscape_mcp::cli;

fn main() -> ExitCode {
    cli::run()
}
