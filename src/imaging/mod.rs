//! Raster image I/O and pixel transforms.

pub mod adjust;
pub mod container;
pub mod filters;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod quantize;
pub mod stats;
