//! Core MCP server implementation.

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt};

use crate::envelope::ToolResult;
use crate::tools::analysis::AnalysisParams;
use crate::tools::batch::BatchParams;
use crate::tools::color::ColorParams;
use crate::tools::file::FileParams;
use crate::tools::filter::FilterParams;
use crate::tools::layer::LayerParams;
use crate::tools::system::SystemParams;
use crate::tools::transform::TransformParams;
use crate::tools::vector::VectorParams;
use crate::tools::{self, ToolContext};

/// The inkscape-mcp server
///
/// Holds the shared [`ToolContext`] and routes each MCP tool call to its
/// dispatcher. Failed operations come back as error content carrying the
/// same envelope, never as protocol errors.
#[derive(Debug, Clone)]
pub struct InkscapeMcpServer {
    ctx: ToolContext,
    tool_router: ToolRouter<Self>,
}

fn into_call_result(result: ToolResult) -> CallToolResult {
    let content = vec![Content::text(result.to_json())];
    if result.success {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    }
}

#[tool_router]
impl InkscapeMcpServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Vector operations on SVG documents: trace_image, apply_boolean, path_operations, \
                       path_combine, path_break_apart, object_to_path, path_inset_outset, path_clean, \
                       optimize_svg, scour_svg, fit_canvas_to_drawing, text_to_path, render_preview, \
                       export_dxf, layers_to_files, measure_object, query_document, count_nodes, \
                       construct_svg, generate_laser_dot, generate_barcode_qr, create_mesh_gradient"
    )]
    async fn inkscape_vector(&self, params: Parameters<VectorParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::vector::dispatch(&self.ctx, params.0).await))
    }

    #[tool(
        description = "Raster filters: blur, sharpen, noise, edge_detect, artistic, enhance, distort, \
                       light_shadow. Reads input_path and writes output_path."
    )]
    async fn inkscape_filter(&self, params: Parameters<FilterParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::filter::dispatch(&self.ctx, params.0).await))
    }

    #[tool(
        description = "Colour adjustments: brightness_contrast, levels, curves, color_balance, hue_saturation, \
                       colorize, threshold, posterize, desaturate, invert, auto_levels, auto_color"
    )]
    async fn inkscape_color(&self, params: Parameters<ColorParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::color::dispatch(&self.ctx, params.0).await))
    }

    #[tool(description = "Geometric transforms: resize, crop, rotate, flip, scale, autocrop, perspective")]
    async fn inkscape_transform(&self, params: Parameters<TransformParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::transform::dispatch(&self.ctx, params.0).await))
    }

    #[tool(
        description = "Read-only image analysis: histogram, statistics, quality, compare, detect_issues, \
                       color_profile, metadata, report"
    )]
    async fn inkscape_analysis(&self, params: Parameters<AnalysisParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::analysis::dispatch(&self.ctx, params.0).await))
    }

    #[tool(description = "Raster file handling: load, save, convert, info, validate, list_formats")]
    async fn inkscape_file(&self, params: Parameters<FileParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::file::dispatch(&self.ctx, params.0).await))
    }

    #[tool(
        description = "Layer inspection and flattening for SVG, GIF, multi-page TIFF and flat raster images: \
                       info, flatten, merge"
    )]
    async fn inkscape_layer(&self, params: Parameters<LayerParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::layer::dispatch(&self.ctx, params.0).await))
    }

    #[tool(
        description = "Apply one operation to every matching image in a directory: resize, convert, \
                       process, watermark, rename, optimize. Per-file failures are reported, not fatal."
    )]
    async fn inkscape_batch(&self, params: Parameters<BatchParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::batch::dispatch(&self.ctx, params.0).await))
    }

    #[tool(description = "Server information: status, help, config, version")]
    async fn inkscape_system(&self, params: Parameters<SystemParams>) -> Result<CallToolResult, McpError> {
        Ok(into_call_result(tools::system::dispatch(&self.ctx, params.0).await))
    }
}

#[tool_handler]
impl ServerHandler for InkscapeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "inkscape-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Inkscape automation and raster image processing. Every tool takes an `operation` \
                 name plus flat parameters and returns a JSON envelope with success, message, data \
                 and execution_time_ms. Call inkscape_system with operation=help to list operations, \
                 and operation=status to check whether Inkscape is installed."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server on stdin/stdout
pub async fn run_server(ctx: ToolContext) -> Result<(), Box<dyn std::error::Error>> {
    let server = InkscapeMcpServer::new(ctx);
    tracing::info!("mcp server listening on stdio");
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_server_info() {
        let server = InkscapeMcpServer::new(ToolContext::new(Config::default(), None));
        let info = server.get_info();
        assert_eq!(info.server_info.name, "inkscape-mcp");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_all_tools_registered() {
        let names: Vec<String> = InkscapeMcpServer::tool_router().list_all().into_iter().map(|t| t.name.to_string()).collect();
        for tool in [
            "inkscape_vector",
            "inkscape_filter",
            "inkscape_color",
            "inkscape_transform",
            "inkscape_analysis",
            "inkscape_file",
            "inkscape_layer",
            "inkscape_batch",
            "inkscape_system",
        ] {
            assert!(names.iter().any(|n| n == tool), "missing {}", tool);
        }
    }

    #[tokio::test]
    async fn test_failed_envelope_is_error_content() {
        let server = InkscapeMcpServer::new(ToolContext::new(Config::default(), None));
        let result = server
            .inkscape_system(Parameters(SystemParams { operation: "nope".into() }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
