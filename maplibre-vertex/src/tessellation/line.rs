//! Stroking of polylines into triangle strips which are extruded to their width on the GPU.
//!
//! Every vertex is `[x, y, dx, dy]`: the position scaled by [`COORD_SCALE`] and the extrusion
//! vector scaled by [`DIR_SCALE`]. The two low bits of `dx` and `dy` carry the texture
//! coordinates used for antialiasing and round caps.

use cgmath::{InnerSpace, Vector2};

use crate::{
    geometry::GeometryBuffer,
    render::layer::{Layer, LineLayer},
    settings::{LineSettings, VertexSettings},
    style::Cap,
    COORD_SCALE,
};

/// Scale of the extrusion vectors.
pub const DIR_SCALE: f32 = 2048.0;

/// Keeps the extrusion vector and drops the two texture coordinate bits.
const DIR_MASK: i32 = !3;

fn dir(value: f32) -> i32 {
    (value * DIR_SCALE) as i32
}

fn pack(dir: i32, bits: i32) -> i16 {
    (bits | (dir & DIR_MASK)) as i16
}

fn vertex(layer: &mut Layer, p: Vector2<f32>, dx: i16, dy: i16) {
    layer.push_vertex(&[
        (p.x * COORD_SCALE) as i16,
        (p.y * COORD_SCALE) as i16,
        dx,
        dy,
    ]);
}

#[derive(Clone, Copy, Debug)]
pub struct LineStroker {
    tile_size: f32,
    settings: LineSettings,
}

impl LineStroker {
    pub fn new(settings: &VertexSettings) -> Self {
        Self {
            tile_size: settings.tile_size,
            settings: settings.line,
        }
    }

    /// Strokes every run of `geometry` with the cap of the layer style. Runs with fewer than two
    /// points are skipped.
    pub fn stroke(&self, layer: &mut LineLayer, geometry: &GeometryBuffer, closed: bool) {
        let cap = layer.style.as_ref().map_or(Cap::Butt, |style| style.cap);

        let mut rounded = cap == Cap::Round;
        if rounded {
            let runs = geometry.runs().count();
            if runs > self.settings.round_cap_limit {
                log::debug!("{} runs, disabling round caps", runs);
                rounded = false;
            }
        }
        layer.round_cap = rounded;

        for run in geometry.runs() {
            if run.len() < 4 {
                continue;
            }
            self.stroke_run(&mut layer.layer, run, closed, rounded, cap == Cap::Square);
        }
    }

    /// Strokes a single polyline given as `x, y` pairs.
    pub fn stroke_points(&self, layer: &mut LineLayer, points: &[f32], closed: bool) {
        if points.len() < 4 {
            return;
        }
        let cap = layer.style.as_ref().map_or(Cap::Butt, |style| style.cap);
        layer.round_cap = cap == Cap::Round;
        self.stroke_run(
            &mut layer.layer,
            points,
            closed,
            cap == Cap::Round,
            cap == Cap::Square,
        );
    }

    fn outside(&self, p: Vector2<f32>) -> bool {
        let min = -self.settings.cap_guard;
        let max = self.tile_size + self.settings.cap_guard;
        p.x < min || p.x > max || p.y < min || p.y > max
    }

    fn stroke_run(
        &self,
        layer: &mut Layer,
        points: &[f32],
        closed: bool,
        rounded: bool,
        squared: bool,
    ) {
        let n = points.len() / 2;
        let point = |i: usize| Vector2::new(points[2 * i], points[2 * i + 1]);

        let mut cur = point(0);
        let mut i = 1;
        // Unit vector of the first segment
        let mut v = loop {
            if i >= n {
                log::debug!("skipping line without extent");
                return;
            }
            let d = point(i) - cur;
            i += 1;
            let a = d.magnitude();
            if a > 0.0 {
                break d / a;
            }
        };
        let mut u = Vector2::new(-v.y, v.x);

        let outside = self.outside(cur);
        if rounded && !outside {
            let dx = pack(dir(u.x - v.x), 0);
            let dy = pack(dir(u.y - v.y), 2);
            vertex(layer, cur, dx, dy);
            vertex(layer, cur, dx, dy);

            vertex(layer, cur, pack(dir(-(u.x + v.x)), 2), pack(dir(-(u.y + v.y)), 2));

            let (ddx, ddy) = (dir(u.x), dir(u.y));
            vertex(layer, cur, pack(ddx, 0), pack(ddy, 1));
            vertex(layer, cur, pack(-ddx, 2), pack(-ddy, 1));
        } else {
            // Outside endpoints are most likely clipped, extend them a little.
            let t = if squared {
                Vector2::new(0.0, 0.0)
            } else if outside {
                v
            } else {
                v * 0.5
            };
            let dx = pack(dir(u.x - t.x), 0);
            let dy = pack(dir(u.y - t.y), 1);
            vertex(layer, cur, dx, dy);
            vertex(layer, cur, dx, dy);

            vertex(layer, cur, pack(dir(-(u.x + t.x)), 2), pack(dir(-(u.y + t.y)), 1));
        }

        cur = point(i - 1);
        // Points back to the previous node
        v = -v;
        let mut flip = false;

        let end = if closed { n + 1 } else { n };
        while i < end {
            let next = if i < n { point(i) } else { point(0) };
            i += 1;

            let w = next - cur;
            let a = w.magnitude();
            if a < self.settings.min_segment_length {
                continue;
            }
            let w = w / a;

            u = v + w;
            let a = w.x * u.y - w.y * u.x;
            if a.abs() < 0.01 {
                // Almost straight
                u = Vector2::new(-w.y, w.x);
            } else {
                u /= a;
                if u.x.abs() > self.settings.miter_limit || u.y.abs() > self.settings.miter_limit {
                    u = v - w;
                    let a = -w.y * u.x + w.x * u.y;
                    u /= a;
                    flip = !flip;
                }
            }

            let (mut ddx, mut ddy) = (dir(u.x), dir(u.y));
            if flip {
                ddx = -ddx;
                ddy = -ddy;
            }
            vertex(layer, cur, pack(ddx, 0), pack(ddy, 1));
            vertex(layer, cur, pack(-ddx, 2), pack(-ddy, 1));

            cur = next;
            v = -w;
        }

        u = Vector2::new(v.y, -v.x);
        let sign = if flip { -1 } else { 1 };

        let outside = self.outside(cur);
        if rounded && !outside {
            let (ddx, ddy) = (sign * dir(u.x), sign * dir(u.y));
            vertex(layer, cur, pack(ddx, 0), pack(ddy, 1));
            vertex(layer, cur, pack(-ddx, 2), pack(-ddy, 1));

            vertex(
                layer,
                cur,
                pack(sign * dir(u.x - v.x), 0),
                pack(sign * dir(u.y - v.y), 0),
            );

            let dx = pack(sign * dir(-(u.x + v.x)), 2);
            let dy = pack(sign * dir(-(u.y + v.y)), 0);
            vertex(layer, cur, dx, dy);
            vertex(layer, cur, dx, dy);
        } else {
            let t = if squared {
                Vector2::new(0.0, 0.0)
            } else if outside {
                v
            } else {
                v * 0.5
            };
            vertex(
                layer,
                cur,
                pack(sign * dir(u.x - t.x), 0),
                pack(sign * dir(u.y - t.y), 1),
            );

            let dx = pack(sign * dir(-(u.x + t.x)), 2);
            let dy = pack(sign * dir(-(u.y + t.y)), 1);
            vertex(layer, cur, dx, dy);
            vertex(layer, cur, dx, dy);
        }
    }
}
