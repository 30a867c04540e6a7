//! Plain-text SVG generation and light source inspection.
//!
//! Documents are assembled with `format!`; any caller-supplied text is run
//! through [`escape`] first. Inspection is regex based and only understands
//! the attribute forms Inkscape itself writes.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

static GROUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<g\b[^>]*>").expect("valid regex"));
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:.-]+)\s*=\s*"([^"]*)""#).expect("valid regex"));
static PATH_COMMAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[MmLlHhVvCcSsQqTtAa]").expect("valid regex"));
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?").expect("valid regex"));

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// First `n` characters, never splitting a code point.
pub fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Animated green pointer dot with a pulsing ring, on an 800x600 canvas.
pub fn laser_dot(x: f64, y: f64) -> String {
    format!(
        r##"{XML_HEADER}
<svg width="800" height="600" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <radialGradient id="laserGradient" cx="50%" cy="50%" r="50%">
      <stop offset="0%" style="stop-color:#00FF00;stop-opacity:1" />
      <stop offset="70%" style="stop-color:#00FF00;stop-opacity:0.8" />
      <stop offset="100%" style="stop-color:#00FF00;stop-opacity:0" />
    </radialGradient>
  </defs>
  <circle cx="{x}" cy="{y}" r="15" fill="url(#laserGradient)">
    <animate attributeName="r" values="10;20;10" dur="0.3s" repeatCount="indefinite"/>
    <animate attributeName="opacity" values="1;0.7;1" dur="0.2s" repeatCount="indefinite"/>
  </circle>
  <circle cx="{x}" cy="{y}" r="8" fill="none" stroke="#00FF00" stroke-width="2" opacity="0.6">
    <animate attributeName="r" values="8;25;8" dur="1s" repeatCount="indefinite"/>
    <animate attributeName="opacity" values="0.6;0;0.6" dur="1s" repeatCount="indefinite"/>
  </circle>
</svg>
"##
    )
}

/// Modules per side of the QR-style grid.
pub const QR_MODULES: usize = 25;
const QR_CELL: usize = 8;
const QR_QUIET: usize = 4;

fn in_finder(row: usize, col: usize) -> bool {
    let near = |v: usize| v < 8;
    let far = |v: usize| v >= QR_MODULES - 8;
    (near(row) && near(col)) || (near(row) && far(col)) || (far(row) && near(col))
}

/// Data-derived module pattern outside the finder regions. FNV-1a over the
/// payload seeds a xorshift stream, so equal input gives an equal grid.
fn qr_modules(data: &str) -> Vec<bool> {
    let mut state = data.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    if state == 0 {
        state = 0x9e37_79b9_7f4a_7c15;
    }
    (0..QR_MODULES * QR_MODULES)
        .map(|i| {
            if in_finder(i / QR_MODULES, i % QR_MODULES) {
                return false;
            }
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state & 1 == 1
        })
        .collect()
}

/// Square code-like graphic for `data`.
///
/// This is a visual stand-in: the three finder squares are drawn and the
/// remaining modules are derived from the payload, but no Reed-Solomon
/// encoding takes place, so scanners will not decode it. The payload is
/// printed underneath as a caption.
pub fn qr_placeholder(data: &str) -> String {
    let grid = (QR_MODULES + 2 * QR_QUIET) * QR_CELL;
    let height = grid + 40;
    let mut svg = format!(
        "{XML_HEADER}\n<svg width=\"{grid}\" height=\"{height}\" viewBox=\"0 0 {grid} {height}\" xmlns=\"http://www.w3.org/2000/svg\">\n  <rect width=\"{grid}\" height=\"{height}\" fill=\"#FFFFFF\"/>\n"
    );

    let origin = QR_QUIET * QR_CELL;
    for (row, col) in [(0, 0), (0, QR_MODULES - 7), (QR_MODULES - 7, 0)] {
        let (x, y) = (origin + col * QR_CELL, origin + row * QR_CELL);
        let _ = writeln!(svg, "  <rect x=\"{x}\" y=\"{y}\" width=\"{}\" height=\"{}\" fill=\"#000000\"/>", 7 * QR_CELL, 7 * QR_CELL);
        let _ = writeln!(
            svg,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#FFFFFF\"/>",
            x + QR_CELL,
            y + QR_CELL,
            5 * QR_CELL,
            5 * QR_CELL
        );
        let _ = writeln!(
            svg,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"#000000\"/>",
            x + 2 * QR_CELL,
            y + 2 * QR_CELL,
            3 * QR_CELL,
            3 * QR_CELL
        );
    }

    let mut d = String::new();
    for (i, on) in qr_modules(data).into_iter().enumerate() {
        if on {
            let (row, col) = (i / QR_MODULES, i % QR_MODULES);
            let _ = write!(d, "M{} {}h{c}v{c}h-{c}z", origin + col * QR_CELL, origin + row * QR_CELL, c = QR_CELL);
        }
    }
    let _ = writeln!(svg, "  <path d=\"{d}\" fill=\"#000000\"/>");

    let caption = escape(truncate_chars(data, 40));
    let _ = writeln!(
        svg,
        "  <text x=\"{}\" y=\"{}\" text-anchor=\"middle\" font-family=\"monospace\" font-size=\"12\">{caption}</text>",
        grid / 2,
        grid + 24
    );
    svg.push_str("</svg>\n");
    svg
}

/// Whether a description asks for the Polish coat of arms.
pub fn is_crest_request(description: &str) -> bool {
    let lowered = description.to_lowercase();
    lowered.contains("poland") && (lowered.contains("crest") || lowered.contains("arms"))
}

const CREST_SVG: &str = r##"<svg width="400" height="500" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <style>
      .heraldic { fill: #FFD700; stroke: #B8860B; stroke-width: 3; }
      .crown { fill: #8B4513; stroke: #654321; }
    </style>
  </defs>
  <polygon points="200,50 170,80 185,80 160,110 175,110 150,140 200,120 250,140 225,110 240,110 215,80 230,80" class="crown"/>
  <ellipse cx="200" cy="300" rx="80" ry="120" class="heraldic"/>
  <circle cx="200" cy="180" r="40" class="heraldic"/>
  <circle cx="185" cy="170" r="5" fill="#000"/>
  <circle cx="215" cy="170" r="5" fill="#000"/>
  <polygon points="200,190 190,210 210,210" class="heraldic"/>
  <path d="M 120 250 Q 100 200 140 180 Q 160 190 180 185 Q 200 180 220 185 Q 240 190 260 180 Q 300 200 280 250 Z" class="heraldic"/>
  <rect x="190" y="380" width="20" height="60" class="heraldic"/>
  <circle cx="200" cy="370" r="15" class="heraldic"/>
  <circle cx="200" cy="365" r="8" fill="#FF0000"/>
</svg>
"##;

/// Build a document for a free-text description.
///
/// A request for the Polish crest gets a stylised eagle; anything else a
/// geometric composition captioned with the first 30 characters of the
/// description.
pub fn construct(description: &str) -> String {
    if is_crest_request(description) {
        return format!("{XML_HEADER}\n{CREST_SVG}");
    }
    let caption = escape(truncate_chars(description, 30));
    format!(
        r##"{XML_HEADER}
<svg width="800" height="600" xmlns="http://www.w3.org/2000/svg">
  <defs>
    <style>
      .shape {{ fill: #3498db; stroke: #2980b9; stroke-width: 2; }}
      .text {{ font-family: Arial, sans-serif; fill: #2c3e50; }}
    </style>
  </defs>
  <rect x="100" y="100" width="200" height="150" class="shape"/>
  <circle cx="400" cy="200" r="80" class="shape"/>
  <polygon points="600,100 700,100 650,200" class="shape"/>
  <text x="400" y="500" text-anchor="middle" class="text" font-size="24">Generated from: {caption}...</text>
</svg>
"##
    )
}

fn default_stop_color() -> String {
    "#000000".to_string()
}

fn default_stop_opacity() -> f64 {
    1.0
}

/// One colour stop of a mesh gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GradientStop {
    #[serde(default = "default_stop_color")]
    #[schemars(description = "Stop colour (default: #000000)")]
    pub color: String,
    #[serde(default = "default_stop_opacity")]
    #[schemars(description = "Stop opacity 0-1 (default: 1.0)")]
    pub opacity: f64,
    #[serde(default)]
    #[schemars(description = "Patch origin x")]
    pub x: f64,
    #[serde(default)]
    #[schemars(description = "Patch origin y")]
    pub y: f64,
}

/// SVG2 mesh gradient on a 400x400 rectangle: one 50x50 patch per stop,
/// starting a new row after every second stop.
pub fn mesh_gradient(stops: &[GradientStop]) -> String {
    let mut svg = format!(
        "{XML_HEADER}\n<svg width=\"400\" height=\"400\" xmlns=\"http://www.w3.org/2000/svg\">\n  <defs>\n    <meshgradient id=\"meshGradient\" x=\"0%\" y=\"0%\" gradientUnits=\"userSpaceOnUse\">\n"
    );
    for (i, stop) in stops.iter().enumerate() {
        if i == 0 {
            svg.push_str("      <meshrow>\n");
        } else if i % 2 == 0 {
            svg.push_str("      </meshrow>\n      <meshrow>\n");
        }
        let (x, y) = (stop.x, stop.y);
        let _ = writeln!(svg, "        <meshpatch>");
        let _ = writeln!(
            svg,
            "          <stop path=\"c {x},{y} {},{y} {},{} {x},{} z\" style=\"stop-color:{};stop-opacity:{}\"/>",
            x + 50.0,
            x + 50.0,
            y + 50.0,
            y + 50.0,
            escape(&stop.color),
            stop.opacity
        );
        let _ = writeln!(svg, "        </meshpatch>");
    }
    if !stops.is_empty() {
        svg.push_str("      </meshrow>\n");
    }
    svg.push_str("    </meshgradient>\n  </defs>\n  <rect width=\"400\" height=\"400\" fill=\"url(#meshGradient)\"/>\n</svg>\n");
    svg
}

/// Id of the text element in [`text_document`].
pub const TEXT_ELEMENT_ID: &str = "text-to-convert";

/// 800x200 document holding a single text element to be converted to paths.
pub fn text_document(text: &str, font_family: &str, font_size: f64) -> String {
    format!(
        "{XML_HEADER}\n<svg width=\"800\" height=\"200\" xmlns=\"http://www.w3.org/2000/svg\">\n  <text x=\"50\" y=\"100\" font-family=\"{}\" font-size=\"{}\" fill=\"black\" id=\"{TEXT_ELEMENT_ID}\">{}</text>\n</svg>\n",
        escape(font_family),
        font_size,
        escape(text)
    )
}

/// Rasterised trace: every horizontal run of ink pixels becomes a 1px-high
/// rectangle in a single path. Returns the document and the run count.
pub fn trace_runs<F>(width: u32, height: u32, is_ink: F) -> (String, usize)
where
    F: Fn(u32, u32) -> bool,
{
    let mut d = String::new();
    let mut runs = 0;
    for y in 0..height {
        let mut x = 0;
        while x < width {
            if !is_ink(x, y) {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && is_ink(x, y) {
                x += 1;
            }
            let len = x - start;
            let _ = write!(d, "M{start} {y}h{len}v1h-{len}z");
            runs += 1;
        }
    }
    let svg = format!(
        "{XML_HEADER}\n<svg width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" xmlns=\"http://www.w3.org/2000/svg\">\n  <path id=\"trace\" d=\"{d}\" fill=\"#000000\" fill-rule=\"nonzero\"/>\n</svg>\n"
    );
    (svg, runs)
}

// ============================================================================
// Inspection
// ============================================================================

/// An Inkscape layer found in an SVG source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvgLayer {
    pub id: String,
    pub label: String,
    pub visible: bool,
}

fn attributes(tag: &str) -> impl Iterator<Item = (&str, &str)> {
    ATTRIBUTE.captures_iter(tag).filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
}

fn is_hidden(style: &str) -> bool {
    style.split(';').any(|decl| {
        let mut kv = decl.splitn(2, ':');
        matches!((kv.next(), kv.next()), (Some(k), Some(v)) if k.trim() == "display" && v.trim() == "none")
    })
}

/// Groups marked `inkscape:groupmode="layer"`, in document order.
///
/// A layer without a label is named after its id; one without either gets
/// `layerN` by position.
pub fn find_layers(source: &str) -> Vec<SvgLayer> {
    GROUP_TAG
        .find_iter(source)
        .filter_map(|tag| {
            let attrs: Vec<(&str, &str)> = attributes(tag.as_str()).collect();
            let get = |name: &str| attrs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);
            (get("inkscape:groupmode") == Some("layer")).then(|| {
                let id = get("id").unwrap_or_default().to_string();
                let label = get("inkscape:label").map(str::to_string).unwrap_or_else(|| id.clone());
                let visible = !get("style").map(is_hidden).unwrap_or(false);
                SvgLayer { id, label, visible }
            })
        })
        .enumerate()
        .map(|(i, mut layer)| {
            if layer.id.is_empty() {
                layer.id = format!("layer{}", i + 1);
                if layer.label.is_empty() {
                    layer.label = layer.id.clone();
                }
            }
            layer
        })
        .collect()
}

/// Node count of the element with `id`.
///
/// For `<path>` this counts drawing commands in `d` (each starts a node;
/// `Z` closes without adding one). For `<polygon>`/`<polyline>` it counts
/// coordinate pairs in `points`. `None` when the element is missing or has
/// no geometry of either kind.
pub fn count_nodes(source: &str, id: &str) -> Option<usize> {
    let pattern = format!(r#"<[\w:]+\b[^>]*\bid\s*=\s*"{}"[^>]*>"#, regex::escape(id));
    let element = Regex::new(&pattern).ok()?.find(source)?;
    let attrs: Vec<(&str, &str)> = attributes(element.as_str()).collect();
    let get = |name: &str| attrs.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

    if let Some(d) = get("d") {
        return Some(PATH_COMMAND.find_iter(d).count());
    }
    get("points").map(|points| NUMBER.find_iter(points).count() / 2)
}

/// `low` up to 50 nodes, `medium` up to 100, `high` beyond.
pub fn complexity(nodes: usize) -> &'static str {
    if nodes > 100 {
        "high"
    } else if nodes > 50 {
        "medium"
    } else {
        "low"
    }
}
