//! Linearizes a populated [`LayerSet`] into one vertex buffer on the thread which owns the GPU.

use std::mem;

use crate::{
    error::Error,
    render::{
        layer::{Bounds, Compilable, LayerKind, LayerSet, LayerSetState, RenderLayer},
        TextureHandle, UploadSurface,
    },
    tessellation::extrusion::CompiledExtrusion,
};

/// Draw range of one atlas tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRange {
    pub handle: TextureHandle,
    pub index_offset: usize,
    pub index_count: usize,
}

/// Where a layer ended up in [`CompiledBuffer::vertices`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerRange {
    pub kind: LayerKind,
    pub level: i32,
    /// Offset in `i16` values.
    pub offset: usize,
    pub vertex_count: usize,
    /// Outline indices of a polygon layer in [`CompiledBuffer::indices`], relative to the
    /// layer's first vertex.
    pub index_offset: usize,
    pub index_count: usize,
    /// Extent of a polygon layer.
    pub bounds: Option<Bounds>,
    /// Levels of the line layers a casing layer draws.
    pub outlines: Vec<i32>,
    /// Sprites keep their screen size while zooming.
    pub fixed: bool,
    /// Empty for lines and polygons.
    pub textures: Vec<TextureRange>,
}

impl LayerRange {
    fn new(kind: LayerKind, level: i32, offset: usize, vertex_count: usize) -> Self {
        Self {
            kind,
            level,
            offset,
            vertex_count,
            index_offset: 0,
            index_count: 0,
            bounds: None,
            outlines: Vec::new(),
            fixed: false,
            textures: Vec::new(),
        }
    }

    /// Index of the first vertex when the buffer is bound at `region_offset` with the layer's
    /// stride.
    pub fn first_vertex(&self, region_offset: usize) -> usize {
        (self.offset - region_offset) / self.kind.stride()
    }
}

/// Polygons, then lines, then texture layers. Extrusions get their own buffers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledBuffer {
    pub vertices: Vec<i16>,
    /// Start of the line region in `i16` values.
    pub line_offset: usize,
    /// Start of the texture region in `i16` values.
    pub texture_offset: usize,
    /// Polygon outline indices.
    pub indices: Vec<u16>,
    pub layers: Vec<LayerRange>,
    pub extrusions: Vec<CompiledExtrusion>,
}

impl CompiledBuffer {
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.extrusions.is_empty()
    }
}

/// Reuses one scratch buffer for consecutive compilations.
#[derive(Debug, Default)]
pub struct BufferCompiler {
    scratch: Vec<i16>,
}

impl BufferCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads pending atlas tiles, writes every layer into one buffer and returns the vertex
    /// blocks to the arena. Textures released by earlier tiles are deleted first.
    ///
    /// Texture layers must have been prepared.
    pub fn compile<S: UploadSurface + ?Sized>(
        &mut self,
        set: &mut LayerSet,
        surface: &mut S,
    ) -> Result<CompiledBuffer, Error> {
        for handle in set.texture_pool().take_released() {
            surface.release_texture(handle);
        }

        if set.state() == LayerSetState::Compiled {
            log::error!("layer set was already compiled");
            debug_assert!(false, "layer set compiled twice");
            return Ok(CompiledBuffer::default());
        }

        // Uploads can fail, so they happen before any layer gives up its blocks.
        for layer in set.texture_layers_mut() {
            for tile in layer.textures_mut() {
                if tile.handle.is_none() {
                    tile.handle = Some(surface.upload_texture(&tile.image)?);
                }
            }
        }

        let size = set.get_size();
        let mut vertices = mem::take(&mut self.scratch);
        vertices.clear();
        vertices.reserve(size);

        let mut indices = Vec::new();
        let mut layers = Vec::new();
        for kind in [LayerKind::Polygon, LayerKind::Line] {
            for layer in set.layers_mut().iter_mut().filter(|l| l.kind() == kind) {
                layer.compile(&mut vertices);
                let base = layer.base();
                let mut range =
                    LayerRange::new(kind, base.level(), base.offset(), base.vertex_count());

                match layer {
                    RenderLayer::Polygon(polygon) => {
                        range.index_offset = indices.len();
                        polygon.compile_outline(&mut indices);
                        range.index_count = indices.len() - range.index_offset;
                        range.bounds = polygon.bounds();
                    }
                    RenderLayer::Line(line) => {
                        range.outlines = line.outlines().to_vec();
                    }
                }
                layers.push(range);
            }
        }
        let line_offset = layers
            .iter()
            .find(|range| range.kind == LayerKind::Line)
            .map_or(vertices.len(), |range| range.offset);

        let texture_offset = vertices.len();
        for layer in set.texture_layers_mut() {
            layer.compile(&mut vertices);
            let textures = layer
                .textures()
                .iter()
                .filter_map(|tile| {
                    tile.handle.map(|handle| TextureRange {
                        handle,
                        index_offset: tile.index_offset,
                        index_count: tile.index_count,
                    })
                })
                .collect();
            let mut range = LayerRange::new(
                layer.kind(),
                layer.layer.level(),
                layer.layer.offset(),
                layer.layer.vertex_count(),
            );
            range.fixed = layer.fixed;
            range.textures = textures;
            layers.push(range);
        }

        if vertices.len() != size {
            log::error!(
                "compiled {} values but the layers reported {}",
                vertices.len(),
                size
            );
            debug_assert_eq!(vertices.len(), size);
        }

        let extrusions = set
            .extrusion_layers_mut()
            .iter_mut()
            .filter(|layer| layer.layer.vertex_count() > 0)
            .map(|layer| layer.compile())
            .collect();

        set.mark_compiled();
        log::trace!(
            "compiled {} layers into {} vertex values",
            layers.len(),
            vertices.len()
        );

        Ok(CompiledBuffer {
            vertices,
            line_offset,
            texture_offset,
            indices,
            layers,
            extrusions,
        })
    }

    /// Hands the vertex storage of an uploaded buffer back for the next compilation.
    pub fn recycle(&mut self, buffer: CompiledBuffer) {
        if buffer.vertices.capacity() > self.scratch.capacity() {
            self.scratch = buffer.vertices;
        }
    }
}
