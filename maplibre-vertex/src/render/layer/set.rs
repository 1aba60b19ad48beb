use std::sync::Arc;

use crate::{
    atlas::{layer::TextureLayer, pool::TexturePool, Rasterizer},
    render::{
        arena::VertexArena,
        layer::{Clearable, LayerKind, LineLayer, PolygonLayer, RenderLayer},
    },
    settings::AtlasSettings,
    style::Color,
    tessellation::extrusion::ExtrusionLayer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerSetState {
    Empty,
    /// Written by a tile job.
    Populated,
    /// Linearized on the render thread, the blocks are back in the arena.
    Compiled,
    /// All resources were returned.
    Cleared,
}

/// All layers of one tile. Lines and polygons are kept ordered by level and share one vertex
/// buffer; texture and extrusion layers are kept apart.
#[derive(Debug)]
pub struct LayerSet {
    arena: Arc<VertexArena>,
    texture_pool: Arc<TexturePool>,
    layers: Vec<RenderLayer>,
    /// Index of the layer returned last.
    current: Option<usize>,
    texture_layers: Vec<TextureLayer>,
    extrusion_layers: Vec<ExtrusionLayer>,
    state: LayerSetState,
}

impl LayerSet {
    pub fn new(arena: Arc<VertexArena>, texture_pool: Arc<TexturePool>) -> Self {
        Self {
            arena,
            texture_pool,
            layers: Vec::new(),
            current: None,
            texture_layers: Vec::new(),
            extrusion_layers: Vec::new(),
            state: LayerSetState::Empty,
        }
    }

    pub fn arena(&self) -> &Arc<VertexArena> {
        &self.arena
    }

    pub fn texture_pool(&self) -> &Arc<TexturePool> {
        &self.texture_pool
    }

    pub fn state(&self) -> LayerSetState {
        self.state
    }

    fn begin_mutation(&mut self) {
        match self.state {
            LayerSetState::Compiled => {
                log::error!("layer set modified after compile, clear it first");
                debug_assert!(false, "layer set modified after compile");
            }
            LayerSetState::Empty | LayerSetState::Cleared => {
                self.state = LayerSetState::Populated;
            }
            LayerSetState::Populated => {}
        }
    }

    /// Finds or inserts the line or polygon layer of `level`. Returns `None` for the other kinds,
    /// which are not part of the ordered set.
    pub fn get_layer(&mut self, level: i32, kind: LayerKind) -> Option<&mut RenderLayer> {
        self.begin_mutation();

        if let Some(current) = self.current {
            let cached = self
                .layers
                .get(current)
                .map_or(false, |layer| layer.level() == level && layer.kind() == kind);
            if cached {
                return self.layers.get_mut(current);
            }
        }

        let mut position = self.layers.len();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.level() == level && layer.kind() == kind {
                self.current = Some(i);
                return self.layers.get_mut(i);
            }
            if layer.level() > level {
                position = i;
                break;
            }
        }

        let layer = match RenderLayer::new(kind, level, self.arena.clone()) {
            Some(layer) => layer,
            None => {
                log::error!("{:?} layers are not kept ordered by level", kind);
                debug_assert!(false, "{:?} is neither a line nor a polygon layer", kind);
                return None;
            }
        };
        self.layers.insert(position, layer);
        self.current = Some(position);
        self.layers.get_mut(position)
    }

    pub fn line_layer(&mut self, level: i32) -> Option<&mut LineLayer> {
        self.get_layer(level, LayerKind::Line)
            .and_then(RenderLayer::as_line_mut)
    }

    pub fn polygon_layer(&mut self, level: i32) -> Option<&mut PolygonLayer> {
        self.get_layer(level, LayerKind::Polygon)
            .and_then(RenderLayer::as_polygon_mut)
    }

    /// Appends a new text, symbol or bitmap layer.
    pub fn add_texture_layer(&mut self, kind: LayerKind, level: i32) -> &mut TextureLayer {
        self.begin_mutation();
        let layer = TextureLayer::new(kind, level, self.arena.clone(), self.texture_pool.clone());
        let index = self.texture_layers.len();
        self.texture_layers.push(layer);
        &mut self.texture_layers[index]
    }

    pub fn add_extrusion_layer(&mut self, level: i32, color: Color) -> &mut ExtrusionLayer {
        self.begin_mutation();
        let layer = ExtrusionLayer::new(level, color, self.arena.clone());
        let index = self.extrusion_layers.len();
        self.extrusion_layers.push(layer);
        &mut self.extrusion_layers[index]
    }

    pub fn layers(&self) -> &[RenderLayer] {
        &self.layers
    }

    pub fn texture_layers(&self) -> &[TextureLayer] {
        &self.texture_layers
    }

    pub fn extrusion_layers(&self) -> &[ExtrusionLayer] {
        &self.extrusion_layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [RenderLayer] {
        &mut self.layers
    }

    pub(crate) fn texture_layers_mut(&mut self) -> &mut [TextureLayer] {
        &mut self.texture_layers
    }

    pub(crate) fn extrusion_layers_mut(&mut self) -> &mut [ExtrusionLayer] {
        &mut self.extrusion_layers
    }

    pub(crate) fn mark_compiled(&mut self) {
        self.state = LayerSetState::Compiled;
    }

    /// Rasterizes the sprites of all texture layers. Last step of populating a tile.
    pub fn prepare<R: Rasterizer + ?Sized>(
        &mut self,
        rasterizer: &mut R,
        settings: &AtlasSettings,
    ) {
        for layer in &mut self.texture_layers {
            layer.prepare(rasterizer, settings);
        }
    }

    /// Number of `i16` values
    /// [`BufferCompiler::compile`](crate::render::compiler::BufferCompiler::compile)
    /// writes into the shared vertex buffer.
    pub fn get_size(&self) -> usize {
        let base: usize = self
            .layers
            .iter()
            .map(|layer| layer.base().vertex_count() * layer.kind().stride())
            .sum();
        let textures: usize = self
            .texture_layers
            .iter()
            .map(|layer| layer.layer.vertex_count() * layer.kind().stride())
            .sum();
        base + textures
    }

    /// Returns every block and atlas tile and drops all layers.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
        for layer in &mut self.texture_layers {
            layer.clear();
        }
        for layer in &mut self.extrusion_layers {
            layer.clear();
        }
        self.layers.clear();
        self.texture_layers.clear();
        self.extrusion_layers.clear();
        self.current = None;
        self.state = LayerSetState::Cleared;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::VertexSettings;

    fn layer_set() -> LayerSet {
        let settings = VertexSettings::default();
        LayerSet::new(
            Arc::new(VertexArena::new(settings.pool_limit)),
            Arc::new(TexturePool::new(&settings.atlas)),
        )
    }

    #[test]
    fn layers_are_ordered_by_level() {
        let mut set = layer_set();
        set.line_layer(5);
        set.polygon_layer(1);
        set.line_layer(3);
        set.polygon_layer(5);
        set.line_layer(1);

        let order: Vec<_> = set
            .layers()
            .iter()
            .map(|layer| (layer.level(), layer.kind()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, LayerKind::Polygon),
                (1, LayerKind::Line),
                (3, LayerKind::Line),
                (5, LayerKind::Line),
                (5, LayerKind::Polygon),
            ]
        );
        assert_eq!(set.state(), LayerSetState::Populated);
    }

    #[test]
    fn repeated_lookups_return_the_same_layer() {
        let mut set = layer_set();
        set.line_layer(2).unwrap().layer.push_vertex(&[1, 2, 3, 4]);
        set.polygon_layer(2).unwrap();
        set.line_layer(2).unwrap().layer.push_vertex(&[1, 2, 3, 4]);
        set.line_layer(2).unwrap().layer.push_vertex(&[1, 2, 3, 4]);

        assert_eq!(set.layers().len(), 2);
        assert_eq!(set.line_layer(2).unwrap().layer.vertex_count(), 3);
    }

    #[test]
    fn size_counts_strides() {
        let mut set = layer_set();
        set.line_layer(0).unwrap().layer.push_vertex(&[0; 4]);
        set.polygon_layer(0).unwrap().layer.push_vertex(&[0; 2]);
        set.polygon_layer(0).unwrap().layer.push_vertex(&[0; 2]);
        set.add_texture_layer(LayerKind::Symbol, 0)
            .layer
            .push_vertex(&[0; 6]);
        set.add_extrusion_layer(0, [0; 4]).layer.push_vertex(&[0; 4]);

        assert_eq!(set.get_size(), 4 + 2 * 2 + 6);
    }

    #[test]
    fn clear_returns_all_blocks() {
        let mut set = layer_set();
        for level in 0..4 {
            let layer = set.line_layer(level).unwrap();
            for _ in 0..200 {
                layer.layer.push_vertex(&[0; 4]);
            }
        }
        assert!(set.arena().stats().in_use >= 4 * 2);

        set.clear();
        assert_eq!(set.arena().stats().in_use, 0);
        assert!(set.layers().is_empty());
        assert_eq!(set.state(), LayerSetState::Cleared);
        assert_eq!(set.get_size(), 0);
    }

    #[test]
    fn dropping_returns_all_blocks() {
        let mut set = layer_set();
        let arena = set.arena().clone();
        set.polygon_layer(0).unwrap().layer.push_vertex(&[0; 2]);
        set.add_extrusion_layer(0, [0; 4]).layer.push_vertex(&[0; 4]);
        assert_eq!(arena.stats().in_use, 2);

        drop(set);
        assert_eq!(arena.stats().in_use, 0);
    }

    #[test]
    fn layer_sets_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<LayerSet>();
    }
}
