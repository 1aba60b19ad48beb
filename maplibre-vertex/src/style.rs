//! Style descriptors read by the tessellators. Evaluating style rules happens elsewhere.

/// RGBA color.
pub type Color = [u8; 4];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Cap {
    #[default]
    Butt,
    Square,
    Round,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f32,
    pub cap: Cap,
}

impl LineStyle {
    pub fn new(color: Color, width: f32, cap: Cap) -> Self {
        Self { color, width, cap }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AreaStyle {
    pub color: Color,
    pub stroke_color: Color,
    /// Ring outlines are indexed when this is positive.
    pub stroke_width: f32,
}

impl AreaStyle {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            stroke_color: color,
            stroke_width: 0.0,
        }
    }

    pub fn with_outline(mut self, color: Color, width: f32) -> Self {
        self.stroke_color = color;
        self.stroke_width = width;
        self
    }

    pub fn has_outline(&self) -> bool {
        self.stroke_width > 0.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    /// Outline width, `0` for a plain fill.
    pub stroke_width: f32,
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            stroke_width: 0.0,
        }
    }

    pub fn stroke(color: Color, stroke_width: f32) -> Self {
        Self {
            color,
            stroke_width,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font_height: f32,
    pub font_descent: f32,
    /// Captions are screen aligned, other labels follow their path.
    pub caption: bool,
    /// Vertical offset of captions.
    pub dy: f32,
    pub fill: Paint,
    /// Halo drawn below the fill.
    pub stroke: Option<Paint>,
}

impl TextStyle {
    pub fn new(font_height: f32, font_descent: f32, fill: Paint) -> Self {
        Self {
            font_height,
            font_descent,
            caption: false,
            dy: 0.0,
            fill,
            stroke: None,
        }
    }

    pub fn caption(mut self, dy: f32) -> Self {
        self.caption = true;
        self.dy = dy;
        self
    }

    pub fn with_stroke(mut self, stroke: Paint) -> Self {
        self.stroke = Some(stroke);
        self
    }
}
