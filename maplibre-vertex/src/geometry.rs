//! Decoded tile geometry as handed over by the tile decoder.

/// A flat coordinate buffer with a run-length index.
///
/// Every index entry gives the number of `f32` values of one run (a polyline or a polygon ring).
/// A `0` entry separates polygons, a negative entry ends the list early.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryBuffer {
    pub points: Vec<f32>,
    pub index: Vec<i32>,
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(points: Vec<f32>, index: Vec<i32>) -> Self {
        Self { points, index }
    }

    /// Starts a new polyline or ring.
    pub fn start_run(&mut self) {
        self.index.push(0);
    }

    /// Starts a new polygon. Runs added until the next call are its outline and holes.
    pub fn start_polygon(&mut self) {
        if self.index.last().map_or(false, |len| *len > 0) {
            self.index.push(0);
        }
        self.start_run();
    }

    pub fn add_point(&mut self, x: f32, y: f32) {
        if self.index.is_empty() {
            self.start_run();
        }
        self.points.push(x);
        self.points.push(y);
        if let Some(len) = self.index.last_mut() {
            *len += 2;
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.index.clear();
    }

    pub fn runs(&self) -> Runs<'_> {
        Runs {
            points: &self.points,
            index: &self.index,
            position: 0,
            offset: 0,
        }
    }
}

/// Iterator over the runs of a [`GeometryBuffer`]. Yields an empty slice for a `0` entry.
pub struct Runs<'a> {
    points: &'a [f32],
    index: &'a [i32],
    position: usize,
    offset: usize,
}

impl<'a> Iterator for Runs<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.index.get(self.position)?;
        if len < 0 {
            return None;
        }
        self.position += 1;

        let start = self.offset;
        self.offset += len as usize;
        match self.points.get(start..self.offset) {
            Some(run) => Some(run),
            None => {
                log::debug!(
                    "run {}..{} exceeds {} coordinates",
                    start,
                    self.offset,
                    self.points.len()
                );
                None
            }
        }
    }
}
