use std::sync::Arc;

use image::RgbaImage;

use crate::style::TextStyle;

/// What gets rasterized into the atlas.
#[derive(Clone, Debug)]
pub enum Sprite {
    Text {
        text: Arc<str>,
        style: Arc<TextStyle>,
    },
    Image(Arc<RgbaImage>),
}

impl Sprite {
    /// Whether both sprites rasterize to the same pixels.
    pub fn same_source(&self, other: &Sprite) -> bool {
        match (self, other) {
            (
                Sprite::Text { text, style },
                Sprite::Text {
                    text: other_text,
                    style: other_style,
                },
            ) => {
                (Arc::ptr_eq(style, other_style) || style == other_style)
                    && (Arc::ptr_eq(text, other_text) || text == other_text)
            }
            (Sprite::Image(image), Sprite::Image(other_image)) => {
                Arc::ptr_eq(image, other_image)
            }
            _ => false,
        }
    }
}

/// How a quad is placed around its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    Center,
    /// Relative position (0..1) of the hotspot within the sprite.
    Hotspot { x: f32, y: f32 },
    /// Label along the path segment from `(x1, y1)` to `(x2, y2)`.
    Path { x1: f32, y1: f32, x2: f32, y2: f32 },
}

/// One placement of a sprite in tile units.
#[derive(Clone, Debug)]
pub struct SpriteItem {
    pub x: f32,
    pub y: f32,
    pub sprite: Sprite,
    pub anchor: Anchor,
}

impl SpriteItem {
    pub fn label(x: f32, y: f32, text: Arc<str>, style: Arc<TextStyle>) -> Self {
        Self {
            x,
            y,
            sprite: Sprite::Text { text, style },
            anchor: Anchor::Center,
        }
    }

    pub fn path_label(
        x: f32,
        y: f32,
        text: Arc<str>,
        style: Arc<TextStyle>,
        from: (f32, f32),
        to: (f32, f32),
    ) -> Self {
        Self {
            x,
            y,
            sprite: Sprite::Text { text, style },
            anchor: Anchor::Path {
                x1: from.0,
                y1: from.1,
                x2: to.0,
                y2: to.1,
            },
        }
    }

    pub fn icon(x: f32, y: f32, image: Arc<RgbaImage>) -> Self {
        Self {
            x,
            y,
            sprite: Sprite::Image(image),
            anchor: Anchor::Center,
        }
    }

    pub fn with_hotspot(mut self, x: f32, y: f32) -> Self {
        self.anchor = Anchor::Hotspot { x, y };
        self
    }
}
