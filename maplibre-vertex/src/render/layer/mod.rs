//! Layers hold the vertices of one geometry type at one style level.

use std::sync::Arc;

use crate::{
    render::arena::{VertexArena, VertexChain},
    style::{AreaStyle, LineStyle},
};

mod set;

pub use set::{LayerSet, LayerSetState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Line,
    Polygon,
    Symbol,
    Text,
    Extrusion,
    Bitmap,
}

impl LayerKind {
    /// Number of `i16` values per vertex.
    pub fn stride(self) -> usize {
        match self {
            LayerKind::Line => 4,
            LayerKind::Polygon => 2,
            LayerKind::Symbol | LayerKind::Text | LayerKind::Bitmap => 6,
            LayerKind::Extrusion => 4,
        }
    }

    pub fn is_texture(self) -> bool {
        matches!(self, LayerKind::Symbol | LayerKind::Text | LayerKind::Bitmap)
    }
}

/// Layers which can be written into a shared vertex buffer.
pub trait Compilable {
    /// Appends all vertices to `out`, records where they start and returns the blocks to the
    /// arena.
    fn compile(&mut self, out: &mut Vec<i16>);
}

/// Layers which hold pooled resources.
pub trait Clearable {
    fn clear(&mut self);
}

/// State shared by every layer type.
#[derive(Debug)]
pub struct Layer {
    kind: LayerKind,
    level: i32,
    chain: VertexChain,
    vertex_count: usize,
    offset: usize,
}

impl Layer {
    pub fn new(kind: LayerKind, level: i32, arena: Arc<VertexArena>) -> Self {
        Self {
            kind,
            level,
            chain: VertexChain::new(arena),
            vertex_count: 0,
            offset: 0,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Offset of the first vertex value in the compiled buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn chain(&self) -> &VertexChain {
        &self.chain
    }

    pub fn push_vertex(&mut self, vertex: &[i16]) {
        debug_assert_eq!(vertex.len(), self.kind.stride());
        self.chain.push(vertex);
        self.vertex_count += 1;
    }

    /// Returns the blocks to the arena but keeps the vertex count for drawing.
    pub(crate) fn release_blocks(&mut self) {
        self.chain.release();
    }

    /// Copy of all vertices written so far.
    pub fn vertices(&self) -> Vec<i16> {
        self.chain.values().collect()
    }
}

impl Compilable for Layer {
    fn compile(&mut self, out: &mut Vec<i16>) {
        self.offset = out.len();
        self.chain.copy_into(out);
        self.release_blocks();
    }
}

impl Clearable for Layer {
    fn clear(&mut self) {
        self.chain.release();
        self.vertex_count = 0;
    }
}

#[derive(Debug)]
pub struct LineLayer {
    pub layer: Layer,
    pub style: Option<LineStyle>,
    /// Set when the last stroked batch used round caps.
    pub round_cap: bool,
    /// Levels of line layers whose vertices are drawn again with this style, as casings.
    outlines: Vec<i32>,
}

impl LineLayer {
    pub fn new(level: i32, arena: Arc<VertexArena>) -> Self {
        Self {
            layer: Layer::new(LayerKind::Line, level, arena),
            style: None,
            round_cap: false,
            outlines: Vec::new(),
        }
    }

    pub fn set_style(&mut self, style: LineStyle) {
        self.style = Some(style);
    }

    /// Links the line layer of `level`. Each level is linked once.
    pub fn add_outline(&mut self, level: i32) {
        if !self.outlines.contains(&level) {
            self.outlines.push(level);
        }
    }

    pub fn outlines(&self) -> &[i32] {
        &self.outlines
    }
}

impl Clearable for LineLayer {
    fn clear(&mut self) {
        self.layer.clear();
        self.outlines.clear();
    }
}

/// Extent of a polygon layer in fixed-point tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i16,
    pub min_y: i16,
    pub max_x: i16,
    pub max_y: i16,
}

impl Bounds {
    fn point(x: i16, y: i16) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: i16, y: i16) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

#[derive(Debug)]
pub struct PolygonLayer {
    pub layer: Layer,
    pub area: Option<AreaStyle>,
    /// Pairs of layer-local vertex indices along every ring.
    outline: VertexChain,
    outline_count: usize,
    bounds: Option<Bounds>,
}

impl PolygonLayer {
    pub fn new(level: i32, arena: Arc<VertexArena>) -> Self {
        Self {
            layer: Layer::new(LayerKind::Polygon, level, arena.clone()),
            area: None,
            outline: VertexChain::new(arena),
            outline_count: 0,
            bounds: None,
        }
    }

    pub fn set_area(&mut self, area: AreaStyle) {
        self.area = Some(area);
    }

    /// Number of outline indices, two per ring edge.
    pub fn outline_count(&self) -> usize {
        self.outline_count
    }

    pub fn outline_indices(&self) -> Vec<u16> {
        self.outline.values().map(|i| i as u16).collect()
    }

    /// Extent of all ring points, used to limit the stencil pass.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub(crate) fn include(&mut self, x: i16, y: i16) {
        match &mut self.bounds {
            Some(bounds) => bounds.include(x, y),
            None => self.bounds = Some(Bounds::point(x, y)),
        }
    }

    pub(crate) fn push_outline(&mut self, from: usize, to: usize) {
        self.outline.push(&[from as u16 as i16, to as u16 as i16]);
        self.outline_count += 2;
    }

    /// Appends the outline indices to `out` and returns their blocks to the arena.
    pub(crate) fn compile_outline(&mut self, out: &mut Vec<u16>) {
        out.extend(self.outline.values().map(|i| i as u16));
        self.outline.release();
    }
}

impl Clearable for PolygonLayer {
    fn clear(&mut self) {
        self.layer.clear();
        self.outline.release();
        self.outline_count = 0;
        self.bounds = None;
    }
}

/// A layer of the ordered set which shares the main vertex buffer.
#[derive(Debug)]
pub enum RenderLayer {
    Line(LineLayer),
    Polygon(PolygonLayer),
}

impl RenderLayer {
    /// Only lines and polygons live in the ordered set.
    pub fn new(kind: LayerKind, level: i32, arena: Arc<VertexArena>) -> Option<Self> {
        match kind {
            LayerKind::Line => Some(RenderLayer::Line(LineLayer::new(level, arena))),
            LayerKind::Polygon => Some(RenderLayer::Polygon(PolygonLayer::new(level, arena))),
            _ => None,
        }
    }

    pub fn base(&self) -> &Layer {
        match self {
            RenderLayer::Line(line) => &line.layer,
            RenderLayer::Polygon(polygon) => &polygon.layer,
        }
    }

    pub fn base_mut(&mut self) -> &mut Layer {
        match self {
            RenderLayer::Line(line) => &mut line.layer,
            RenderLayer::Polygon(polygon) => &mut polygon.layer,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.base().kind()
    }

    pub fn level(&self) -> i32 {
        self.base().level()
    }

    pub fn as_line_mut(&mut self) -> Option<&mut LineLayer> {
        match self {
            RenderLayer::Line(line) => Some(line),
            RenderLayer::Polygon(_) => None,
        }
    }

    pub fn as_line(&self) -> Option<&LineLayer> {
        match self {
            RenderLayer::Line(line) => Some(line),
            RenderLayer::Polygon(_) => None,
        }
    }

    pub fn as_polygon_mut(&mut self) -> Option<&mut PolygonLayer> {
        match self {
            RenderLayer::Polygon(polygon) => Some(polygon),
            RenderLayer::Line(_) => None,
        }
    }
}

impl Compilable for RenderLayer {
    fn compile(&mut self, out: &mut Vec<i16>) {
        self.base_mut().compile(out)
    }
}

impl Clearable for RenderLayer {
    fn clear(&mut self) {
        match self {
            RenderLayer::Line(line) => line.clear(),
            RenderLayer::Polygon(polygon) => polygon.clear(),
        }
    }
}
