//! Visibility test of consecutive segments against the tile rectangle.

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

/// Cohen-Sutherland style test of a polyline, one segment at a time.
#[derive(Clone, Copy, Debug)]
pub struct TileClipper {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    prev: (f32, f32),
    prev_code: u8,
}

impl TileClipper {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            prev: (0.0, 0.0),
            prev_code: INSIDE,
        }
    }

    fn outcode(&self, x: f32, y: f32) -> u8 {
        let mut code = INSIDE;
        if x < self.min_x {
            code |= LEFT;
        } else if x > self.max_x {
            code |= RIGHT;
        }
        if y < self.min_y {
            code |= BOTTOM;
        } else if y > self.max_y {
            code |= TOP;
        }
        code
    }

    pub fn start(&mut self, x: f32, y: f32) {
        self.prev = (x, y);
        self.prev_code = self.outcode(x, y);
    }

    /// Whether the segment from the previous point to `x`, `y` touches the rectangle.
    pub fn next(&mut self, x: f32, y: f32) -> bool {
        let code = self.outcode(x, y);
        let (x0, y0) = self.prev;
        let code0 = self.prev_code;
        self.prev = (x, y);
        self.prev_code = code;

        if code0 | code == INSIDE {
            return true;
        }
        if code0 & code != INSIDE {
            return false;
        }
        self.intersects(x0, y0, code0, x, y, code)
    }

    fn intersects(
        &self,
        mut x0: f32,
        mut y0: f32,
        mut code0: u8,
        x1: f32,
        y1: f32,
        code1: u8,
    ) -> bool {
        // Moves the first endpoint onto the rectangle edges until the segment is accepted or
        // rejected. Each step removes one outcode bit, so this terminates.
        for _ in 0..4 {
            if code0 == INSIDE {
                return true;
            }
            if code0 & code1 != INSIDE {
                return false;
            }
            let (x, y) = if code0 & TOP != 0 {
                (x0 + (x1 - x0) * (self.max_y - y0) / (y1 - y0), self.max_y)
            } else if code0 & BOTTOM != 0 {
                (x0 + (x1 - x0) * (self.min_y - y0) / (y1 - y0), self.min_y)
            } else if code0 & RIGHT != 0 {
                (self.max_x, y0 + (y1 - y0) * (self.max_x - x0) / (x1 - x0))
            } else {
                (self.min_x, y0 + (y1 - y0) * (self.min_x - x0) / (x1 - x0))
            };
            x0 = x;
            y0 = y;
            code0 = self.outcode(x0, y0);
        }
        code0 == INSIDE
    }
}
