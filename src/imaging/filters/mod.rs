//! Named pixel transforms applied by the `inkscape_filter` tool.
//!
//! Every function takes an RGBA buffer and returns a new buffer of the same
//! dimensions. Arithmetic runs in `f32` and is clamped back to `u8`.

mod artistic;
mod blur;
mod distort;
mod edge;
mod enhance;
mod light;
mod noise;
mod sharpen;

pub use artistic::{artistic, ArtisticEffect};
pub use blur::{blur, motion_kernel, BlurMethod};
pub use distort::{distort, DistortEffect};
pub use edge::{edge_detect, EdgeMethod};
pub use enhance::{enhance, enhance_sharpness, EnhanceMethod};
pub use light::{light_shadow, vignette, LightEffect};
pub use noise::{noise, NoiseMethod};
pub use sharpen::{sharpen, SharpenMethod};

use crate::error::{ToolError, ToolOutcome};

/// Look `value` up in a name table, failing with the list of valid names.
pub(crate) fn parse_choice<T: Copy>(value: &str, what: &str, table: &[(&str, T)]) -> ToolOutcome<T> {
    let needle = value.trim().to_ascii_lowercase();
    table.iter().find(|(name, _)| *name == needle).map(|(_, v)| *v).ok_or_else(|| {
        let names: Vec<&str> = table.iter().map(|(n, _)| *n).collect();
        ToolError::invalid(format!("Unknown {} '{}'. Valid: {}", what, value, names.join(", ")))
    })
}

/// Effects that exist in the catalog but have no raster implementation.
pub(crate) fn unsupported(what: &str, name: &str) -> ToolError {
    ToolError::Unsupported(format!("{} '{}'", what, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Fruit {
        Apple,
        Pear,
    }

    #[test]
    fn test_parse_choice() {
        let table = [("apple", Fruit::Apple), ("pear", Fruit::Pear)];
        assert_eq!(parse_choice(" Pear ", "fruit", &table).unwrap(), Fruit::Pear);

        let err = parse_choice("plum", "fruit", &table).unwrap_err();
        assert_eq!(err.tag(), "ValueError");
        assert_eq!(err.to_string(), "Unknown fruit 'plum'. Valid: apple, pear");
    }
}
