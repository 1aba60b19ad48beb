//! Backing rasters of the atlas, shared by all texture layers.

use std::{
    fmt,
    sync::{Mutex, MutexGuard},
};

use image::RgbaImage;

use crate::{render::TextureHandle, settings::AtlasSettings};

/// A raster and, once uploaded, its texture.
pub struct TextureTile {
    pub image: RgbaImage,
    pub handle: Option<TextureHandle>,
    /// First index of the quads which sample this tile.
    pub index_offset: usize,
    pub index_count: usize,
}

impl TextureTile {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            handle: None,
            index_offset: 0,
            index_count: 0,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.handle.is_some()
    }
}

impl fmt::Debug for TextureTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureTile")
            .field("size", &self.image.dimensions())
            .field("handle", &self.handle)
            .field("index_offset", &self.index_offset)
            .field("index_count", &self.index_count)
            .finish()
    }
}

#[derive(Default)]
struct PoolState {
    free: Vec<RgbaImage>,
    released: Vec<TextureHandle>,
}

/// Keeps up to `fill` blank rasters of the atlas tile size. Textures of released tiles are
/// collected until the render thread deletes them.
pub struct TexturePool {
    width: u32,
    height: u32,
    fill: usize,
    state: Mutex<PoolState>,
}

impl TexturePool {
    pub fn new(settings: &AtlasSettings) -> Self {
        Self {
            width: settings.tile_width,
            height: settings.tile_height,
            fill: settings.pool_fill,
            state: Mutex::new(PoolState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// A cleared raster of the atlas tile size.
    pub fn get(&self) -> TextureTile {
        let reused = self.lock().free.pop();
        let image = match reused {
            Some(mut image) => {
                image.fill(0);
                image
            }
            None => RgbaImage::new(self.width, self.height),
        };
        TextureTile::new(image)
    }

    pub fn release(&self, tile: TextureTile) {
        let mut state = self.lock();
        if let Some(handle) = tile.handle {
            state.released.push(handle);
        }
        if tile.image.dimensions() == (self.width, self.height) && state.free.len() < self.fill {
            state.free.push(tile.image);
        }
    }

    /// Textures whose tiles went back to the pool. They must be deleted on the GPU thread.
    pub fn take_released(&self) -> Vec<TextureHandle> {
        std::mem::take(&mut self.lock().released)
    }

    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }
}

impl fmt::Debug for TexturePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TexturePool")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("free", &self.free_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn pool(fill: usize) -> TexturePool {
        TexturePool::new(&AtlasSettings {
            tile_width: 16,
            tile_height: 8,
            pool_fill: fill,
            ..AtlasSettings::default()
        })
    }

    #[test]
    fn reused_rasters_are_cleared() {
        let pool = pool(2);
        let mut tile = pool.get();
        tile.image.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        pool.release(tile);
        assert_eq!(pool.free_count(), 1);

        let tile = pool.get();
        assert_eq!(tile.image.dimensions(), (16, 8));
        assert!(tile.image.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn keeps_at_most_fill_rasters() {
        let pool = pool(2);
        let tiles: Vec<_> = (0..4).map(|_| pool.get()).collect();
        for tile in tiles {
            pool.release(tile);
        }
        assert_eq!(pool.free_count(), 2);

        // Foreign sizes are never pooled.
        pool.get();
        pool.release(TextureTile::new(RgbaImage::new(4, 4)));
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn collects_released_textures() {
        let pool = pool(1);
        let mut tile = pool.get();
        tile.handle = Some(TextureHandle(7));
        pool.release(tile);

        assert_eq!(pool.take_released(), vec![TextureHandle(7)]);
        assert!(pool.take_released().is_empty());
    }
}
