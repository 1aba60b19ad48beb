//! Tessellation of lines, polygons and buildings into pooled vertex layers.

pub mod clip;
pub mod extrusion;
pub mod line;
pub mod polygon;
pub mod triangulator;
