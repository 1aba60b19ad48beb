//! Triangle fans for polygon fills. Overlaps are resolved with the stencil buffer when drawing,
//! so every ring is fanned from the tile center regardless of its shape.

use crate::{
    geometry::GeometryBuffer, render::layer::PolygonLayer, settings::VertexSettings,
    tessellation::extrusion::MAX_VERTICES, COORD_SCALE,
};

#[derive(Clone, Copy, Debug)]
pub struct PolygonTessellator {
    center: i16,
}

impl PolygonTessellator {
    pub fn new(settings: &VertexSettings) -> Self {
        Self {
            center: (settings.tile_size / 2.0 * COORD_SCALE) as i16,
        }
    }

    /// Adds one fan per ring: the center, every point and the first point again. Rings with
    /// fewer than three points are skipped.
    ///
    /// With an outlined area style every ring edge is also indexed as a line pair.
    pub fn fill(&self, layer: &mut PolygonLayer, geometry: &GeometryBuffer) {
        let outline = layer.area.as_ref().map_or(false, |area| area.has_outline());

        for ring in geometry.runs() {
            if ring.len() < 6 {
                continue;
            }
            let indexed =
                outline && layer.layer.vertex_count() + ring.len() / 2 + 2 <= MAX_VERTICES;
            if outline && !indexed {
                log::debug!("polygon layer too large for outline indices");
            }

            layer.layer.push_vertex(&[self.center, self.center]);
            for point in ring.chunks_exact(2) {
                let x = (point[0] * COORD_SCALE) as i16;
                let y = (point[1] * COORD_SCALE) as i16;
                layer.include(x, y);

                let index = layer.layer.vertex_count();
                layer.layer.push_vertex(&[x, y]);
                if indexed {
                    layer.push_outline(index, index + 1);
                }
            }
            let x = (ring[0] * COORD_SCALE) as i16;
            let y = (ring[1] * COORD_SCALE) as i16;
            layer.layer.push_vertex(&[x, y]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{render::arena::VertexArena, render::layer::Bounds, style::AreaStyle};

    #[test]
    fn fan_around_tile_center() {
        let mut layer = PolygonLayer::new(0, Arc::new(VertexArena::new(8)));
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        geometry.add_point(0.0, 0.0);
        geometry.add_point(10.0, 0.0);
        geometry.add_point(10.0, 10.0);

        PolygonTessellator::new(&VertexSettings::default()).fill(&mut layer, &geometry);

        assert_eq!(layer.layer.vertex_count(), 3 + 2);
        assert_eq!(
            layer.layer.vertices(),
            vec![1024, 1024, 0, 0, 80, 0, 80, 80, 0, 0]
        );
    }

    #[test]
    fn rings_are_independent_fans() {
        let mut layer = PolygonLayer::new(0, Arc::new(VertexArena::new(8)));
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        for (x, y) in [(0., 0.), (100., 0.), (100., 100.), (0., 100.)] {
            geometry.add_point(x, y);
        }
        // Hole
        geometry.start_run();
        for (x, y) in [(10., 10.), (20., 10.), (20., 20.)] {
            geometry.add_point(x, y);
        }
        // Too small to fill
        geometry.start_polygon();
        geometry.add_point(1.0, 1.0);
        geometry.add_point(2.0, 2.0);

        PolygonTessellator::new(&VertexSettings::default()).fill(&mut layer, &geometry);
        assert_eq!(layer.layer.vertex_count(), (4 + 2) + (3 + 2));
    }

    #[test]
    fn outlined_rings_index_every_edge() {
        let mut layer = PolygonLayer::new(0, Arc::new(VertexArena::new(8)));
        layer.set_area(AreaStyle::new([0, 0, 0, 255]).with_outline([255, 255, 255, 255], 1.0));
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        geometry.add_point(0.0, 0.0);
        geometry.add_point(10.0, 0.0);
        geometry.add_point(10.0, 10.0);
        geometry.start_polygon();
        geometry.add_point(20.0, 20.0);
        geometry.add_point(30.0, 20.0);
        geometry.add_point(30.0, 30.0);

        PolygonTessellator::new(&VertexSettings::default()).fill(&mut layer, &geometry);

        // The last edge of a ring ends at the closing vertex.
        assert_eq!(layer.outline_count(), 12);
        assert_eq!(
            layer.outline_indices(),
            vec![1, 2, 2, 3, 3, 4, 6, 7, 7, 8, 8, 9]
        );
    }

    #[test]
    fn plain_areas_have_no_outline() {
        let mut layer = PolygonLayer::new(0, Arc::new(VertexArena::new(8)));
        layer.set_area(AreaStyle::new([0, 0, 0, 255]));
        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        for (x, y) in [(0., 0.), (10., 0.), (10., 10.)] {
            geometry.add_point(x, y);
        }

        PolygonTessellator::new(&VertexSettings::default()).fill(&mut layer, &geometry);
        assert_eq!(layer.outline_count(), 0);
        assert!(layer.outline_indices().is_empty());
    }

    #[test]
    fn bounds_cover_all_rings() {
        let mut layer = PolygonLayer::new(0, Arc::new(VertexArena::new(8)));
        assert_eq!(layer.bounds(), None);

        let mut geometry = GeometryBuffer::new();
        geometry.start_polygon();
        for (x, y) in [(5., 40.), (50., 8.), (20., 60.)] {
            geometry.add_point(x, y);
        }
        geometry.start_polygon();
        for (x, y) in [(-2., 10.), (10., 10.), (10., 20.)] {
            geometry.add_point(x, y);
        }

        PolygonTessellator::new(&VertexSettings::default()).fill(&mut layer, &geometry);
        assert_eq!(
            layer.bounds(),
            Some(Bounds {
                min_x: -16,
                min_y: 64,
                max_x: 400,
                max_y: 480,
            })
        );
    }
}
