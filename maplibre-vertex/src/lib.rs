//! # maplibre-vertex
//!
//! Turns decoded vector tile geometry into vertex and index data that can be uploaded to a GPU.
//!
//! Tile jobs populate a [`LayerSet`](render::layer::LayerSet) on worker threads by feeding
//! geometry through the [`LineStroker`](tessellation::line::LineStroker),
//! [`PolygonTessellator`](tessellation::polygon::PolygonTessellator),
//! [`BuildingExtruder`](tessellation::extrusion::BuildingExtruder) and the sprite layers of the
//! [`atlas`] module. All vertex memory comes from a shared
//! [`VertexArena`](render::arena::VertexArena). The populated set is then moved to the thread
//! which owns the GPU and linearized by the [`BufferCompiler`](render::compiler::BufferCompiler).
//!
//! ### Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use maplibre_vertex::{
//!     atlas::pool::TexturePool,
//!     geometry::GeometryBuffer,
//!     render::{arena::VertexArena, layer::LayerSet},
//!     settings::VertexSettings,
//!     style::{Cap, LineStyle},
//!     tessellation::line::LineStroker,
//! };
//!
//! let settings = VertexSettings::default();
//! let arena = Arc::new(VertexArena::new(settings.pool_limit));
//! let textures = Arc::new(TexturePool::new(&settings.atlas));
//! let mut set = LayerSet::new(arena, textures);
//!
//! let mut geometry = GeometryBuffer::new();
//! geometry.start_run();
//! geometry.add_point(10.0, 10.0);
//! geometry.add_point(20.0, 10.0);
//!
//! let stroker = LineStroker::new(&settings);
//! if let Some(layer) = set.line_layer(1) {
//!     layer.set_style(LineStyle::new([255, 0, 0, 255], 2.0, Cap::Butt));
//!     stroker.stroke(layer, &geometry, false);
//! }
//! assert_eq!(set.get_size(), 6 * 4);
//! ```

pub mod atlas;
pub mod error;
pub mod geometry;
pub mod render;
pub mod settings;
pub mod style;
pub mod tessellation;

/// Scale from tile units to the fixed-point `i16` vertex coordinates.
pub const COORD_SCALE: f32 = 8.0;
