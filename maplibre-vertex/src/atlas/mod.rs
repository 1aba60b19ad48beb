//! Packing of text labels and icons into texture atlas tiles.

use image::{imageops, RgbaImage};

use crate::style::{Paint, TextStyle};

pub mod layer;
pub mod packer;
pub mod pool;
pub mod sprite;

/// 2D drawing primitives used to fill the atlas rasters.
pub trait Rasterizer {
    /// Width of `text` in pixels.
    fn measure_text(&mut self, text: &str, style: &TextStyle) -> f32;

    /// Draws `text` with its baseline starting at `x`, `y`.
    fn draw_text(&mut self, canvas: &mut RgbaImage, text: &str, x: f32, y: f32, paint: &Paint);

    fn draw_image(&mut self, canvas: &mut RgbaImage, image: &RgbaImage, x: u32, y: u32) {
        imageops::replace(canvas, image, i64::from(x), i64::from(y));
    }
}
