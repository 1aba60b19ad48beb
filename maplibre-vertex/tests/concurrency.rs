use std::{
    sync::{mpsc, Arc},
    thread,
};

use image::RgbaImage;
use maplibre_vertex::{
    atlas::pool::TexturePool,
    error::Error,
    geometry::GeometryBuffer,
    render::{
        arena::VertexArena, compiler::BufferCompiler, layer::LayerSet, TextureHandle,
        UploadSurface,
    },
    settings::VertexSettings,
    style::{Cap, LineStyle},
    tessellation::{line::LineStroker, polygon::PolygonTessellator},
};

struct NullSurface;

impl UploadSurface for NullSurface {
    fn upload_texture(&mut self, _image: &RgbaImage) -> Result<TextureHandle, Error> {
        Ok(TextureHandle(0))
    }

    fn release_texture(&mut self, _handle: TextureHandle) {}
}

fn tile(seed: usize, arena: &Arc<VertexArena>, textures: &Arc<TexturePool>) -> LayerSet {
    let settings = VertexSettings::default();
    let mut set = LayerSet::new(arena.clone(), textures.clone());

    let mut geometry = GeometryBuffer::new();
    for run in 0..20 {
        geometry.start_run();
        for i in 0..30 {
            let x = (i * 8) as f32;
            let y = ((seed + run * 7 + i * 3) % 256) as f32;
            geometry.add_point(x, y);
        }
    }

    let stroker = LineStroker::new(&settings);
    for level in 0..4 {
        let layer = set.line_layer(level).unwrap();
        layer.set_style(LineStyle::new([0; 4], 1.0, Cap::Butt));
        stroker.stroke(layer, &geometry, false);

        let layer = set.polygon_layer(level).unwrap();
        PolygonTessellator::new(&settings).fill(layer, &geometry);
    }
    set
}

#[test]
fn workers_share_the_arena() {
    let arena = Arc::new(VertexArena::new(64));
    let textures = Arc::new(TexturePool::new(&VertexSettings::default().atlas));
    let (sender, receiver) = mpsc::channel();

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let arena = arena.clone();
            let textures = textures.clone();
            let sender = sender.clone();
            thread::spawn(move || {
                for job in 0..4 {
                    let set = tile(worker * 4 + job, &arena, &textures);
                    sender.send(set).unwrap();
                }
            })
        })
        .collect();
    drop(sender);

    let mut compiler = BufferCompiler::new();
    let mut surface = NullSurface;
    let mut compiled = 0;
    for mut set in receiver {
        let expected = set.get_size();
        let buffer = compiler.compile(&mut set, &mut surface).unwrap();
        assert_eq!(buffer.vertices.len(), expected);
        compiler.recycle(buffer);
        set.clear();
        compiled += 1;
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(compiled, 32);
    let stats = arena.stats();
    assert_eq!(stats.in_use, 0);
    assert!(stats.free <= stats.limit);
}

#[test]
fn dropped_sets_return_their_blocks() {
    let arena = Arc::new(VertexArena::new(16));
    let textures = Arc::new(TexturePool::new(&VertexSettings::default().atlas));

    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let arena = arena.clone();
            let textures = textures.clone();
            thread::spawn(move || {
                let set = tile(seed, &arena, &textures);
                assert!(set.get_size() > 0);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(arena.stats().in_use, 0);
}
