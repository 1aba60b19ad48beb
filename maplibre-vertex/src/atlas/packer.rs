//! Shelf packing of sprites into chained atlas tiles.

use image::RgbaImage;

use crate::atlas::pool::{TexturePool, TextureTile};

/// Number of indices drawing one quad.
pub const INDICES_PER_SPRITE: usize = 6;

/// Top-left corner of a packed sprite within the current tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub x: u32,
    pub y: u32,
}

/// Places sprites left to right on shelves. A shelf is as high as its tallest sprite. When the
/// tile is full it is closed with its index range and a fresh one is taken from the pool.
pub struct AtlasPacker<'a> {
    pool: &'a TexturePool,
    width: u32,
    height: u32,
    closed: Vec<TextureTile>,
    current: TextureTile,
    x: u32,
    y: u32,
    shelf_height: u32,
    indices: usize,
    tile_start: usize,
}

impl<'a> AtlasPacker<'a> {
    pub fn new(pool: &'a TexturePool) -> Self {
        let (width, height) = pool.tile_size();
        Self {
            pool,
            width,
            height,
            closed: Vec::new(),
            current: pool.get(),
            x: 0,
            y: 0,
            shelf_height: 0,
            indices: 0,
            tile_start: 0,
        }
    }

    /// Reserves a `width` x `height` cell. Returns `None` if it can never fit into a tile.
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<Slot> {
        if width > self.width || height > self.height {
            return None;
        }

        if self.x + width > self.width {
            self.x = 0;
            self.y += self.shelf_height;
            self.shelf_height = 0;
        }
        if self.y + height > self.height {
            self.close_tile();
        }

        let slot = Slot {
            x: self.x,
            y: self.y,
        };
        self.x += width;
        self.shelf_height = self.shelf_height.max(height);
        Some(slot)
    }

    fn close_tile(&mut self) {
        let next = self.pool.get();
        let mut tile = std::mem::replace(&mut self.current, next);
        tile.index_offset = self.tile_start;
        tile.index_count = self.indices - self.tile_start;
        self.tile_start = self.indices;
        self.closed.push(tile);

        self.x = 0;
        self.y = 0;
        self.shelf_height = 0;
        log::trace!("atlas tile {} full", self.closed.len());
    }

    /// Raster of the tile the last slot was allocated in.
    pub fn canvas(&mut self) -> &mut RgbaImage {
        &mut self.current.image
    }

    /// Records one quad which samples the current tile.
    pub fn add_quad(&mut self) {
        self.indices += INDICES_PER_SPRITE;
    }

    pub fn tile_count(&self) -> usize {
        self.closed.len() + 1
    }

    /// The filled tiles. A trailing tile without quads goes back to the pool.
    pub fn finish(mut self) -> Vec<TextureTile> {
        let mut tile = self.current;
        tile.index_offset = self.tile_start;
        tile.index_count = self.indices - self.tile_start;
        if tile.index_count > 0 {
            self.closed.push(tile);
        } else {
            self.pool.release(tile);
        }
        self.closed
    }
}
