//! Extrusion of building footprints into walls and roofs.
//!
//! Every outline point yields a bottom and a top vertex `[x, y, z, shade]`. Walls are indexed in
//! two interleaved streams so that adjacent faces never share a stream, roofs are fanned when the
//! outline is convex and triangulated otherwise.

use std::sync::Arc;

use crate::{
    geometry::GeometryBuffer,
    render::{
        arena::{VertexArena, VertexChain},
        layer::{Clearable, Layer, LayerKind},
    },
    settings::{BuildingSettings, VertexSettings},
    style::Color,
    tessellation::{clip::TileClipper, triangulator::Triangulator},
    COORD_SCALE,
};

/// Indices are `u16`.
pub const MAX_VERTICES: usize = 1 << 16;

const EVEN_SIDES: usize = 0;
const ODD_SIDES: usize = 1;
const ROOF: usize = 2;

/// Vertex and index data of an extrusion layer, ready for its own GPU buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledExtrusion {
    pub level: i32,
    pub vertices: Vec<i16>,
    /// Even sides, odd sides and roof, in this order.
    pub indices: Vec<u16>,
    pub even_count: usize,
    pub odd_count: usize,
    pub roof_count: usize,
}

impl CompiledExtrusion {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[derive(Debug)]
pub struct ExtrusionLayer {
    pub layer: Layer,
    pub color: Color,
    indices: [VertexChain; 3],
    index_counts: [usize; 3],
}

impl ExtrusionLayer {
    pub fn new(level: i32, color: Color, arena: Arc<VertexArena>) -> Self {
        Self {
            layer: Layer::new(LayerKind::Extrusion, level, arena.clone()),
            color,
            indices: [
                VertexChain::new(arena.clone()),
                VertexChain::new(arena.clone()),
                VertexChain::new(arena),
            ],
            index_counts: [0; 3],
        }
    }

    pub fn even_count(&self) -> usize {
        self.index_counts[EVEN_SIDES]
    }

    pub fn odd_count(&self) -> usize {
        self.index_counts[ODD_SIDES]
    }

    pub fn roof_count(&self) -> usize {
        self.index_counts[ROOF]
    }

    pub fn index_count(&self) -> usize {
        self.index_counts.iter().sum()
    }

    /// Indices of one stream.
    pub fn indices(&self, stream: usize) -> Vec<u16> {
        self.indices[stream].values().map(|i| i as u16).collect()
    }

    fn push_indices(&mut self, stream: usize, indices: &[usize]) {
        let mut values = [0i16; 6];
        for (value, index) in values.iter_mut().zip(indices) {
            *value = *index as u16 as i16;
        }
        self.indices[stream].push(&values[..indices.len()]);
        self.index_counts[stream] += indices.len();
    }

    /// Copies vertices and the concatenated index streams and returns all blocks to the arena.
    pub fn compile(&mut self) -> CompiledExtrusion {
        let mut vertices = Vec::with_capacity(self.layer.chain().len());
        self.layer.chain().copy_into(&mut vertices);

        let mut indices = Vec::with_capacity(self.index_count());
        for chain in &mut self.indices {
            indices.extend(chain.values().map(|i| i as u16));
            chain.release();
        }
        self.layer.release_blocks();

        CompiledExtrusion {
            level: self.layer.level(),
            vertices,
            indices,
            even_count: self.index_counts[EVEN_SIDES],
            odd_count: self.index_counts[ODD_SIDES],
            roof_count: self.index_counts[ROOF],
        }
    }
}

impl Clearable for ExtrusionLayer {
    fn clear(&mut self) {
        self.layer.clear();
        for chain in &mut self.indices {
            chain.release();
        }
        self.index_counts = [0; 3];
    }
}

fn shade(dx: f32, length: f32) -> i32 {
    ((1.0 + dx / length) * 127.0) as i32
}

pub struct BuildingExtruder<'t, T: Triangulator + ?Sized> {
    settings: BuildingSettings,
    tile_size: f32,
    triangulator: &'t T,
}

impl<'t, T: Triangulator + ?Sized> BuildingExtruder<'t, T> {
    pub fn new(settings: &VertexSettings, triangulator: &'t T) -> Self {
        Self {
            settings: settings.building,
            tile_size: settings.tile_size,
            triangulator,
        }
    }

    /// Extrudes every polygon of `geometry` from `min_height` to `height`. Polygons are separated
    /// by empty runs, the first ring of a polygon is its outline.
    pub fn extrude(
        &self,
        layer: &mut ExtrusionLayer,
        geometry: &GeometryBuffer,
        height: f32,
        min_height: f32,
    ) {
        let top = self.settings.scaled_height(height);
        let bottom = if min_height > 0.0 {
            self.settings.scaled_height(min_height).min(top)
        } else {
            0
        };

        let mut rings: Vec<&[f32]> = Vec::new();
        for run in geometry.runs() {
            if run.is_empty() {
                self.add_polygon(layer, &rings, bottom, top);
                rings.clear();
            } else {
                rings.push(run);
            }
        }
        self.add_polygon(layer, &rings, bottom, top);
    }

    fn add_polygon(&self, layer: &mut ExtrusionLayer, rings: &[&[f32]], bottom: i16, top: i16) {
        let rings: Vec<&[f32]> = rings
            .iter()
            .map(|ring| {
                let len = ring.len() & !1;
                if len >= 4 && ring[0] == ring[len - 2] && ring[1] == ring[len - 1] {
                    &ring[..len - 2]
                } else {
                    &ring[..len]
                }
            })
            .filter(|ring| ring.len() >= 6)
            .collect();
        if rings.is_empty() {
            return;
        }

        let needed: usize = rings
            .iter()
            .map(|ring| ring.len() + if ring.len() % 4 != 0 { 2 } else { 0 })
            .sum();
        if layer.layer.vertex_count() + needed > MAX_VERTICES {
            log::debug!("skipping building, layer has too many vertices");
            return;
        }

        let simple = rings.len() == 1;
        let mut bases = Vec::with_capacity(rings.len());
        let mut convex = false;
        for (i, ring) in rings.iter().enumerate() {
            bases.push(layer.layer.vertex_count());
            let ring_convex = self.add_outline(layer, ring, bottom, top, simple);
            if i == 0 {
                convex = ring_convex;
            }
        }

        if simple && (convex || rings[0].len() <= 8) {
            Self::add_roof_simple(layer, bases[0], rings[0].len());
        } else {
            self.add_roof(layer, &rings, &bases);
        }
    }

    fn add_roof_simple(layer: &mut ExtrusionLayer, start: usize, len: usize) {
        let first = start + 1;
        for k in (0..len - 4).step_by(2) {
            layer.push_indices(ROOF, &[first, first + k + 2, first + k + 4]);
        }
    }

    fn add_roof(&self, layer: &mut ExtrusionLayer, rings: &[&[f32]], bases: &[usize]) {
        let points: Vec<f32> = rings.iter().flat_map(|ring| ring.iter().copied()).collect();
        let ring_sizes: Vec<usize> = rings.iter().map(|ring| ring.len() / 2).collect();

        let triangles = self.triangulator.triangulate(&points, &ring_sizes);
        if triangles.is_empty() {
            log::debug!("no roof for building with {} rings", rings.len());
            return;
        }

        // Point j of the polygon is point k of ring r, its top vertex is 2k + 1 after the ring
        // start.
        let top_vertex = |j: usize| -> Option<usize> {
            let mut k = j;
            for (size, base) in ring_sizes.iter().zip(bases) {
                if k < *size {
                    return Some(base + 2 * k + 1);
                }
                k -= size;
            }
            None
        };

        for triangle in triangles.chunks_exact(3) {
            let mapped = (
                top_vertex(triangle[0] as usize),
                top_vertex(triangle[1] as usize),
                top_vertex(triangle[2] as usize),
            );
            match mapped {
                (Some(a), Some(b), Some(c)) => layer.push_indices(ROOF, &[a, b, c]),
                _ => log::debug!("triangulation returned unknown points {:?}", triangle),
            }
        }
    }

    /// Adds the wall vertices and indices of one ring. Returns whether the ring is convex, which
    /// is only checked for `check_convex`.
    fn add_outline(
        &self,
        layer: &mut ExtrusionLayer,
        ring: &[f32],
        bottom: i16,
        top: i16,
        check_convex: bool,
    ) -> bool {
        let len = ring.len();
        // An odd number of points gets a closing face so that the zig-zag indices line up.
        let add_face = len % 4 != 0;
        let vertex_cnt = len + if add_face { 2 } else { 0 };
        let v_offset = layer.layer.vertex_count();

        let mut convex = check_convex;
        let (mut nx, mut ny) = (ring[0], ring[1]);

        let mut vx = nx - ring[len - 2];
        let mut vy = ny - ring[len - 1];
        let mut color1 = shade(vx, (vx * vx + vy * vy).sqrt());
        let first_color = color1;

        let mut even = EVEN_SIDES;
        let mut change_x = 0;
        let mut change_y = 0;
        let mut angle_sign = 0;

        let mut clipper = TileClipper::new(0.0, 0.0, self.tile_size, self.tile_size);
        clipper.start(nx, ny);

        let mut i = 2;
        while i < vertex_cnt + 2 {
            let (cx, cy) = (nx, ny);
            let (ux, uy) = (vx, vy);
            let x = (cx * COORD_SCALE) as i16;
            let y = (cy * COORD_SCALE) as i16;

            if i < len {
                nx = ring[i];
                ny = ring[i + 1];
            } else if i == len {
                nx = ring[0];
                ny = ring[1];
            } else {
                let c = (color1 | first_color << 8) as i16;
                layer.layer.push_vertex(&[x, y, bottom, c]);
                layer.layer.push_vertex(&[x, y, top, c]);
                break;
            }

            vx = nx - cx;
            vy = ny - cy;
            let color2 = shade(vx, (vx * vx + vy * vy).sqrt());
            let c = if even == EVEN_SIDES {
                (color1 | color2 << 8) as i16
            } else {
                (color2 | color1 << 8) as i16
            };
            layer.layer.push_vertex(&[x, y, bottom, c]);
            layer.layer.push_vertex(&[x, y, top, c]);
            color1 = color2;

            if convex {
                if (ux < 0.0) != (vx < 0.0) {
                    change_x += 1;
                }
                if (uy < 0.0) != (vy < 0.0) {
                    change_y += 1;
                }
                if change_x > 2 || change_y > 2 {
                    convex = false;
                }

                let cross = ux * vy - uy * vx;
                if cross > 0.0 {
                    if angle_sign == -1 {
                        convex = false;
                    }
                    angle_sign = 1;
                } else if cross < 0.0 {
                    if angle_sign == 1 {
                        convex = false;
                    }
                    angle_sign = -1;
                }
            }

            let visible = clipper.next(nx, ny);
            if visible {
                let vert = v_offset + (i - 2);
                let (s0, s1) = (vert, vert + 1);
                let (mut s2, mut s3) = (vert + 2, vert + 3);
                // Connect the last face to the first
                if !add_face && i == len {
                    s2 -= len;
                    s3 -= len;
                }
                layer.push_indices(even, &[s0, s2, s1, s1, s2, s3]);
            }
            even = if even == EVEN_SIDES { ODD_SIDES } else { EVEN_SIDES };
            i += 2;
        }
        convex
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::tessellation::triangulator::EarcutTriangulator;

    struct FixedTriangulator {
        result: Vec<u32>,
        calls: RefCell<Vec<Vec<usize>>>,
    }

    impl FixedTriangulator {
        fn new(result: Vec<u32>) -> Self {
            Self {
                result,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Triangulator for FixedTriangulator {
        fn triangulate(&self, _points: &[f32], ring_sizes: &[usize]) -> Vec<u32> {
            self.calls.borrow_mut().push(ring_sizes.to_vec());
            self.result.clone()
        }
    }

    fn layer(arena: &Arc<VertexArena>) -> ExtrusionLayer {
        ExtrusionLayer::new(0, [200, 200, 200, 255], arena.clone())
    }

    fn footprint(rings: &[&[(f32, f32)]]) -> GeometryBuffer {
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        for (i, ring) in rings.iter().enumerate() {
            if i > 0 {
                geometry.start_run();
            }
            for (x, y) in ring.iter() {
                geometry.add_point(*x, *y);
            }
        }
        geometry
    }

    const SQUARE: &[(f32, f32)] = &[(0., 0.), (10., 0.), (10., 10.), (0., 10.)];

    #[test]
    fn rectangle_walls_and_roof() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let settings = VertexSettings::default();
        let triangulator = FixedTriangulator::new(vec![]);
        BuildingExtruder::new(&settings, &triangulator).extrude(
            &mut layer,
            &footprint(&[SQUARE]),
            0.0,
            0.0,
        );

        assert_eq!(layer.layer.vertex_count(), 8);
        assert_eq!(layer.indices(EVEN_SIDES), vec![0, 2, 1, 1, 2, 3, 4, 6, 5, 5, 6, 7]);
        assert_eq!(layer.indices(ODD_SIDES), vec![2, 4, 3, 3, 4, 5, 6, 0, 7, 7, 0, 1]);
        assert_eq!(layer.indices(ROOF), vec![1, 3, 5, 1, 5, 7]);
        assert!(triangulator.calls.borrow().is_empty());

        // Shade of the edge pointing down, then of the edge pointing right.
        let vertices = layer.layer.vertices();
        assert_eq!(&vertices[..8], &[0, 0, 0, -385, 0, 0, 100, -385]);
    }

    #[test]
    fn odd_rings_get_a_closing_face() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let triangulator = EarcutTriangulator;
        BuildingExtruder::new(&VertexSettings::default(), &triangulator).extrude(
            &mut layer,
            &footprint(&[&[(0., 0.), (10., 0.), (0., 10.)]]),
            12.0,
            0.0,
        );

        assert_eq!(layer.layer.vertex_count(), 8);
        assert_eq!(layer.indices(EVEN_SIDES), vec![0, 2, 1, 1, 2, 3, 4, 6, 5, 5, 6, 7]);
        assert_eq!(layer.indices(ODD_SIDES), vec![2, 4, 3, 3, 4, 5]);
        assert_eq!(layer.indices(ROOF), vec![1, 3, 5]);

        let vertices = layer.layer.vertices();
        assert_eq!(vertices[6], 120);
        // The closing pair repeats the first point.
        assert_eq!(&vertices[24..26], &[0, 0]);
    }

    #[test]
    fn concave_roofs_are_triangulated() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let l_shape: &[(f32, f32)] = &[
            (0., 0.),
            (20., 0.),
            (20., 10.),
            (10., 10.),
            (10., 20.),
            (0., 20.),
        ];
        BuildingExtruder::new(&VertexSettings::default(), &EarcutTriangulator).extrude(
            &mut layer,
            &footprint(&[l_shape]),
            5.0,
            0.0,
        );

        assert_eq!(layer.layer.vertex_count(), 12);
        assert_eq!(layer.roof_count(), 4 * 3);
        assert!(layer.indices(ROOF).iter().all(|i| i % 2 == 1 && *i < 12));
    }

    #[test]
    fn holes_are_remapped_past_padding() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let triangulator = FixedTriangulator::new(vec![0, 4, 6]);
        let hole: &[(f32, f32)] = &[(2., 2.), (4., 2.), (4., 4.)];
        BuildingExtruder::new(&VertexSettings::default(), &triangulator).extrude(
            &mut layer,
            &footprint(&[SQUARE, hole]),
            5.0,
            0.0,
        );

        assert_eq!(*triangulator.calls.borrow(), vec![vec![4, 3]]);
        assert_eq!(layer.layer.vertex_count(), 8 + 8);
        assert_eq!(layer.indices(ROOF), vec![1, 9, 13]);
    }

    #[test]
    fn failed_triangulation_keeps_walls() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let triangulator = FixedTriangulator::new(vec![]);
        let l_shape: &[(f32, f32)] = &[
            (0., 0.),
            (20., 0.),
            (20., 10.),
            (10., 10.),
            (10., 20.),
            (0., 20.),
        ];
        BuildingExtruder::new(&VertexSettings::default(), &triangulator).extrude(
            &mut layer,
            &footprint(&[l_shape]),
            5.0,
            0.0,
        );

        assert_eq!(triangulator.calls.borrow().len(), 1);
        assert_eq!(layer.layer.vertex_count(), 12);
        assert_eq!(layer.even_count() + layer.odd_count(), 6 * 6);
        assert_eq!(layer.roof_count(), 0);
    }

    #[test]
    fn faces_outside_the_tile_are_not_indexed() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let outside: &[(f32, f32)] = &[(-20., -20.), (-10., -20.), (-10., -10.), (-20., -10.)];
        BuildingExtruder::new(&VertexSettings::default(), &EarcutTriangulator).extrude(
            &mut layer,
            &footprint(&[outside]),
            5.0,
            0.0,
        );

        assert_eq!(layer.layer.vertex_count(), 8);
        assert_eq!(layer.even_count() + layer.odd_count(), 0);
        assert_eq!(layer.roof_count(), 6);
    }

    #[test]
    fn closing_points_and_min_height() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let closed: &[(f32, f32)] = &[(0., 0.), (10., 0.), (10., 10.), (0., 10.), (0., 0.)];
        BuildingExtruder::new(&VertexSettings::default(), &EarcutTriangulator).extrude(
            &mut layer,
            &footprint(&[closed]),
            20.0,
            5.0,
        );

        assert_eq!(layer.layer.vertex_count(), 8);
        let vertices = layer.layer.vertices();
        assert_eq!((vertices[2], vertices[6]), (50, 200));
    }

    #[test]
    fn index_range_is_bounded() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        for i in 0..40_000 {
            let angle = i as f32 / 40_000.0 * std::f32::consts::TAU;
            geometry.add_point(100.0 + angle.cos() * 50.0, 100.0 + angle.sin() * 50.0);
        }
        BuildingExtruder::new(&VertexSettings::default(), &EarcutTriangulator).extrude(
            &mut layer,
            &geometry,
            5.0,
            0.0,
        );
        assert_eq!(layer.layer.vertex_count(), 0);
    }

    #[test]
    fn compile_concatenates_streams() {
        let arena = Arc::new(VertexArena::new(16));
        let mut layer = layer(&arena);
        BuildingExtruder::new(&VertexSettings::default(), &EarcutTriangulator).extrude(
            &mut layer,
            &footprint(&[SQUARE]),
            5.0,
            0.0,
        );

        let compiled = layer.compile();
        assert_eq!(compiled.vertices.len(), 8 * 4);
        assert_eq!(compiled.indices.len(), 12 + 12 + 6);
        assert_eq!(
            (compiled.even_count, compiled.odd_count, compiled.roof_count),
            (12, 12, 6)
        );
        assert_eq!(&compiled.indices[24..], &[1, 3, 5, 1, 5, 7]);
        assert_eq!(compiled.index_bytes().len(), 30 * 2);
        assert_eq!(arena.stats().in_use, 0);
    }
}
