//! Layers drawn from atlas textures: text labels, symbols and single bitmaps.

use std::sync::Arc;

use image::RgbaImage;

use crate::{
    atlas::{
        packer::{AtlasPacker, Slot, INDICES_PER_SPRITE},
        pool::{TexturePool, TextureTile},
        sprite::{Anchor, Sprite, SpriteItem},
        Rasterizer,
    },
    render::{
        arena::VertexArena,
        layer::{Clearable, Compilable, Layer, LayerKind},
    },
    settings::AtlasSettings,
    COORD_SCALE,
};

/// Vertices of one sprite quad.
pub const VERTICES_PER_SPRITE: usize = 4;

/// Clears the billboard bit of the packed x coordinate.
const BILLBOARD_MASK: i32 = !1;

#[derive(Debug)]
pub struct TextureLayer {
    pub layer: Layer,
    pool: Arc<TexturePool>,
    items: Vec<SpriteItem>,
    textures: Vec<TextureTile>,
    prepared: bool,
    /// Sprites keep their screen size while zooming.
    pub fixed: bool,
}

impl TextureLayer {
    pub fn new(
        kind: LayerKind,
        level: i32,
        arena: Arc<VertexArena>,
        pool: Arc<TexturePool>,
    ) -> Self {
        debug_assert!(kind.is_texture(), "{:?} is not a texture layer", kind);
        Self {
            layer: Layer::new(kind, level, arena),
            pool,
            items: Vec::new(),
            textures: Vec::new(),
            prepared: false,
            fixed: kind != LayerKind::Bitmap,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.layer.kind()
    }

    pub fn items(&self) -> &[SpriteItem] {
        &self.items
    }

    pub fn textures(&self) -> &[TextureTile] {
        &self.textures
    }

    pub(crate) fn textures_mut(&mut self) -> &mut [TextureTile] {
        &mut self.textures
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Adds a placement next to the placements of the same sprite, so that the sprite is
    /// rasterized once.
    pub fn add(&mut self, item: SpriteItem) {
        debug_assert!(!self.prepared, "sprite added to a prepared layer");
        let position = self
            .items
            .iter()
            .rposition(|other| other.sprite.same_source(&item.sprite))
            .map_or(self.items.len(), |last| last + 1);
        self.items.insert(position, item);
    }

    /// Shows `image` as a single quad of `width` x `height` tile units.
    pub fn set_bitmap(&mut self, image: RgbaImage, width: f32, height: f32) {
        debug_assert_eq!(self.kind(), LayerKind::Bitmap);
        self.release_textures();
        self.layer.clear();

        let w = (width * COORD_SCALE) as i16;
        let h = (height * COORD_SCALE) as i16;
        self.layer.push_vertex(&[0, 0, -1, -1, 0, 0]);
        self.layer.push_vertex(&[0, h, -1, -1, 0, 1]);
        self.layer.push_vertex(&[w, 0, -1, -1, 1, 0]);
        self.layer.push_vertex(&[w, h, -1, -1, 1, 1]);

        let mut tile = TextureTile::new(image);
        tile.index_count = INDICES_PER_SPRITE;
        self.textures.push(tile);
        self.prepared = true;
    }

    /// Rasterizes the sprites into atlas tiles and writes one quad per placement. Runs on the
    /// worker thread after all placements were added.
    pub fn prepare<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &mut R,
        settings: &AtlasSettings,
    ) {
        if self.prepared {
            return;
        }
        self.prepared = true;
        if self.items.is_empty() {
            return;
        }

        let mut packer = AtlasPacker::new(&self.pool);
        let (tile_width, tile_height) = self.pool.tile_size();

        let mut start = 0;
        while start < self.items.len() {
            let sprite = &self.items[start].sprite;
            let end = self.items[start..]
                .iter()
                .position(|item| !item.sprite.same_source(sprite))
                .map_or(self.items.len(), |n| start + n);
            let group = &self.items[start..end];
            start = end;

            let (width, height) = match sprite {
                Sprite::Text { text, style } => {
                    let width = rasterizer.measure_text(text, style).ceil() as u32
                        + 2 * settings.padding_x;
                    let height = style.font_height.ceil() as u32 + 2 * settings.padding_y;
                    (width.min(tile_width), height.min(tile_height))
                }
                Sprite::Image(image) => image.dimensions(),
            };

            let slot = match packer.allocate(width, height) {
                Some(slot) => slot,
                None => {
                    log::warn!(
                        "skipping {} placements of a {}x{} sprite larger than the atlas",
                        group.len(),
                        width,
                        height
                    );
                    continue;
                }
            };

            match sprite {
                Sprite::Text { text, style } => {
                    let x = (slot.x + settings.padding_x) as f32;
                    let baseline = (slot.y + height).saturating_sub(settings.padding_y);
                    let y = baseline as f32 - style.font_descent;
                    if let Some(stroke) = &style.stroke {
                        rasterizer.draw_text(packer.canvas(), text, x, y, stroke);
                    }
                    rasterizer.draw_text(packer.canvas(), text, x, y, &style.fill);
                }
                Sprite::Image(image) => {
                    rasterizer.draw_image(packer.canvas(), image, slot.x, slot.y);
                }
            }

            for item in group {
                add_quad(&mut self.layer, item, slot, width as f32, height as f32);
                packer.add_quad();
            }
        }

        self.textures = packer.finish();
        log::trace!(
            "packed {} sprites into {} atlas tiles",
            self.items.len(),
            self.textures.len()
        );
    }

    fn release_textures(&mut self) {
        for tile in self.textures.drain(..) {
            self.pool.release(tile);
        }
    }
}

fn add_quad(layer: &mut Layer, item: &SpriteItem, slot: Slot, width: f32, height: f32) {
    let s = COORD_SCALE;
    let u1 = (s * slot.x as f32) as i16;
    let v1 = (s * slot.y as f32) as i16;
    let u2 = (s * (slot.x as f32 + width)) as i16;
    let v2 = (s * (slot.y as f32 + height)) as i16;

    let hw = width / 2.0;
    let hh = height / 2.0;

    // Corners: top-left, top-right, bottom-left, bottom-right.
    let (corners, billboard) = match (&item.sprite, item.anchor) {
        (Sprite::Text { style, .. }, Anchor::Path { x1, y1, x2, y2 }) if !style.caption => {
            let mut vx = x1 - x2;
            let mut vy = y1 - y2;
            let a = (vx * vx + vy * vy).sqrt();
            if a > 0.0 {
                vx /= a;
                vy /= a;
            } else {
                vx = 1.0;
                vy = 0.0;
            }
            let ux = -vy * hh;
            let uy = vx * hh;
            vx *= hw;
            vy *= hw;
            (
                [
                    (vx - ux, vy - uy),
                    (-vx - ux, -vy - uy),
                    (vx + ux, vy + uy),
                    (-vx + ux, -vy + uy),
                ],
                false,
            )
        }
        (Sprite::Text { style, .. }, _) => (
            [
                (-hw, style.dy + hh),
                (hw, style.dy + hh),
                (-hw, style.dy - hh),
                (hw, style.dy - hh),
            ],
            style.caption,
        ),
        (Sprite::Image(_), Anchor::Hotspot { x, y }) => {
            let ox = x * width;
            let oy = y * height;
            (
                [
                    (-ox, height - oy),
                    (width - ox, height - oy),
                    (-ox, -oy),
                    (width - ox, -oy),
                ],
                true,
            )
        }
        (Sprite::Image(_), _) => ([(-hw, hh), (hw, hh), (-hw, -hh), (hw, -hh)], true),
    };
    let [top_left, top_right, bottom_left, bottom_right] =
        corners.map(|(x, y)| ((s * x) as i16, (s * y) as i16));

    let tx = (((s * item.x) as i32 & BILLBOARD_MASK) | i32::from(billboard)) as i16;
    let ty = (s * item.y) as i16;

    layer.push_vertex(&[tx, ty, top_left.0, top_left.1, u1, v2]);
    layer.push_vertex(&[tx, ty, bottom_left.0, bottom_left.1, u1, v1]);
    layer.push_vertex(&[tx, ty, top_right.0, top_right.1, u2, v2]);
    layer.push_vertex(&[tx, ty, bottom_right.0, bottom_right.1, u2, v1]);
}

impl Compilable for TextureLayer {
    fn compile(&mut self, out: &mut Vec<i16>) {
        if !self.prepared {
            log::error!("compiling {:?} layer which was never prepared", self.kind());
            debug_assert!(self.prepared);
        }
        self.layer.compile(out);
    }
}

impl Clearable for TextureLayer {
    fn clear(&mut self) {
        self.release_textures();
        self.layer.clear();
        self.items.clear();
        self.prepared = false;
    }
}

impl Drop for TextureLayer {
    fn drop(&mut self) {
        self.release_textures();
    }
}
