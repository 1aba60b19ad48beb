//! Pooled vertex memory, layers and the compilation into upload-ready buffers.

use image::RgbaImage;

use crate::error::Error;

pub mod arena;
pub mod compiler;
pub mod layer;

/// Handle of a texture which lives on the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// The part of the GPU command surface which is needed while compiling layers. Must only be
/// used from the thread that owns the GPU context.
pub trait UploadSurface {
    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, Error>;
    fn release_texture(&mut self, handle: TextureHandle);
}
