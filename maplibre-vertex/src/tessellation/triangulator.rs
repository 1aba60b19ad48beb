//! Triangulation of polygons with holes, used for roofs which are not convex.

/// Triangulates a polygon given as consecutive rings of `x, y` pairs. The first ring is the
/// outline, the others are holes. Returns triangle indices into the points; an empty result means
/// the polygon could not be triangulated.
pub trait Triangulator {
    fn triangulate(&self, points: &[f32], ring_sizes: &[usize]) -> Vec<u32>;
}

/// Ear clipping as implemented by the `earcutr` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct EarcutTriangulator;

impl Triangulator for EarcutTriangulator {
    fn triangulate(&self, points: &[f32], ring_sizes: &[usize]) -> Vec<u32> {
        let data: Vec<f64> = points.iter().map(|v| f64::from(*v)).collect();

        let mut holes = Vec::with_capacity(ring_sizes.len().saturating_sub(1));
        let mut start = 0;
        for (i, size) in ring_sizes.iter().enumerate() {
            if i > 0 {
                holes.push(start);
            }
            start += size;
        }

        match earcutr::earcut(&data, &holes, 2) {
            Ok(indices) => indices.into_iter().map(|i| i as u32).collect(),
            Err(e) => {
                log::debug!("triangulation failed: {:?}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concave_outline() {
        // An L shape
        let points = [0., 0., 20., 0., 20., 10., 10., 10., 10., 20., 0., 20.];
        let indices = EarcutTriangulator.triangulate(&points, &[6]);
        assert_eq!(indices.len(), 4 * 3);
        assert!(indices.iter().all(|i| *i < 6));
    }

    #[test]
    fn outline_with_hole() {
        let points = [
            0., 0., 30., 0., 30., 30., 0., 30., //
            10., 10., 20., 10., 20., 20., 10., 20.,
        ];
        let indices = EarcutTriangulator.triangulate(&points, &[4, 4]);
        assert_eq!(indices.len(), 8 * 3);
    }

    #[test]
    fn degenerate_input_yields_nothing() {
        let points = [0., 0., 10., 0., 20., 0.];
        assert!(EarcutTriangulator.triangulate(&points, &[3]).is_empty());
    }
}
