use std::{path::PathBuf, sync::Arc, time::Instant};

use clap::Parser;
use image::{Rgba, RgbaImage};
use maplibre_vertex::{
    atlas::{pool::TexturePool, sprite::SpriteItem, Rasterizer},
    error::Error,
    geometry::GeometryBuffer,
    render::{
        arena::VertexArena,
        compiler::BufferCompiler,
        layer::{LayerKind, LayerSet},
        TextureHandle, UploadSurface,
    },
    settings::VertexSettings,
    style::{AreaStyle, Cap, LineStyle, Paint, TextStyle},
    tessellation::{
        extrusion::BuildingExtruder, line::LineStroker, polygon::PolygonTessellator,
        triangulator::EarcutTriangulator,
    },
};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuildError};

/// Tessellates synthetic tiles on a worker pool and compiles them like a renderer would.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of tiles to build.
    #[arg(long, default_value_t = 64)]
    tiles: usize,
    /// Worker threads, defaults to the number of cores.
    #[arg(long)]
    threads: Option<usize>,
    /// JSON file with vertex settings.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Writes the first uploaded atlas tile to this PNG file.
    #[arg(long)]
    atlas: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Vertex(#[from] Error),
    #[error("cannot start the worker pool: {0}")]
    Workers(#[from] ThreadPoolBuildError),
}

/// Draws glyphs as boxes, good enough to see the atlas layout.
struct BoxRasterizer;

impl Rasterizer for BoxRasterizer {
    fn measure_text(&mut self, text: &str, style: &TextStyle) -> f32 {
        text.chars().count() as f32 * style.font_height * 0.6
    }

    fn draw_text(&mut self, canvas: &mut RgbaImage, text: &str, x: f32, y: f32, paint: &Paint) {
        let (width, height) = canvas.dimensions();
        let glyph = 8;
        let top = (y - glyph as f32).max(0.0) as u32;
        for (i, _) in text.chars().enumerate() {
            let left = x as u32 + i as u32 * (glyph + 1);
            for px in left..(left + glyph).min(width) {
                for py in top..(y as u32).min(height) {
                    canvas.put_pixel(px, py, Rgba(paint.color));
                }
            }
        }
    }
}

/// Counts what would be sent to the GPU.
#[derive(Default)]
struct HeadlessSurface {
    next: u32,
    live: usize,
    atlas: Option<RgbaImage>,
}

impl UploadSurface for HeadlessSurface {
    fn upload_texture(&mut self, image: &RgbaImage) -> Result<TextureHandle, Error> {
        if self.atlas.is_none() {
            self.atlas = Some(image.clone());
        }
        self.next += 1;
        self.live += 1;
        Ok(TextureHandle(self.next))
    }

    fn release_texture(&mut self, _handle: TextureHandle) {
        self.live = self.live.saturating_sub(1);
    }
}

fn add_square(geometry: &mut GeometryBuffer, x: f32, y: f32, size: f32) {
    geometry.start_polygon();
    geometry.add_point(x, y);
    geometry.add_point(x + size, y);
    geometry.add_point(x + size, y + size);
    geometry.add_point(x, y + size);
}

fn build_tile(
    index: usize,
    settings: &VertexSettings,
    arena: &Arc<VertexArena>,
    textures: &Arc<TexturePool>,
    icon: &Arc<RgbaImage>,
) -> LayerSet {
    let mut set = LayerSet::new(arena.clone(), textures.clone());
    let tile_size = settings.tile_size;
    let offset = (index * 37 % 64) as f32;

    let mut roads = GeometryBuffer::new();
    for row in 0..8 {
        roads.start_run();
        let y = row as f32 * tile_size / 8.0 + offset / 4.0;
        for step in 0..=16 {
            let x = step as f32 * tile_size / 16.0;
            roads.add_point(x, y + ((step + index) % 3) as f32 * 2.0);
        }
    }

    let mut parks = GeometryBuffer::new();
    let mut buildings = GeometryBuffer::new();
    for i in 0..6 {
        let x = (i as f32 * 40.0 + offset) % (tile_size - 30.0);
        add_square(&mut parks, x, x / 2.0, 24.0);
        add_square(&mut buildings, x + 4.0, tile_size - x - 20.0, 12.0);
    }

    let stroker = LineStroker::new(settings);
    for (level, cap) in [(2, Cap::Butt), (3, Cap::Round)] {
        if let Some(layer) = set.line_layer(level) {
            layer.set_style(LineStyle::new([255, 255, 255, 255], 1.5, cap));
            stroker.stroke(layer, &roads, false);
        }
    }
    if let Some(casing) = set.line_layer(1) {
        casing.set_style(LineStyle::new([90, 90, 90, 255], 2.5, Cap::Butt));
        casing.add_outline(2);
    }
    if let Some(layer) = set.polygon_layer(1) {
        layer.set_area(
            AreaStyle::new([120, 200, 120, 255]).with_outline([90, 160, 90, 255], 1.0),
        );
        PolygonTessellator::new(settings).fill(layer, &parks);
    }

    let triangulator = EarcutTriangulator;
    let extruder = BuildingExtruder::new(settings, &triangulator);
    let layer = set.add_extrusion_layer(4, [220, 210, 200, 255]);
    extruder.extrude(layer, &buildings, (index % 5) as f32 * 3.0, 0.0);

    let style = Arc::new(
        TextStyle::new(14.0, 3.0, Paint::fill([40, 40, 40, 255]))
            .with_stroke(Paint::stroke([255, 255, 255, 255], 2.0)),
    );
    let labels = set.add_texture_layer(LayerKind::Text, 5);
    for row in 0..8 {
        let name: Arc<str> = Arc::from(format!("Street {}", (index + row) % 12));
        let y = row as f32 * tile_size / 8.0;
        labels.add(SpriteItem::path_label(
            tile_size / 2.0,
            y,
            name,
            style.clone(),
            (0.0, y),
            (tile_size, y),
        ));
    }

    let symbols = set.add_texture_layer(LayerKind::Symbol, 6);
    for i in 0..4 {
        let x = 20.0 + i as f32 * 50.0;
        symbols.add(SpriteItem::icon(x, x, icon.clone()).with_hotspot(0.5, 1.0));
    }

    set.prepare(&mut BoxRasterizer, &settings.atlas);
    set
}

fn worker_pool(threads: Option<usize>) -> Result<ThreadPool, ThreadPoolBuildError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    builder.build()
}

fn run(args: Args) -> Result<(), DemoError> {
    let settings = match &args.settings {
        Some(path) => VertexSettings::load(path)?,
        None => VertexSettings::default(),
    };
    log::info!("building {} tiles", args.tiles);

    let arena = Arc::new(VertexArena::new(settings.pool_limit));
    let textures = Arc::new(TexturePool::new(&settings.atlas));
    let icon = Arc::new(RgbaImage::from_pixel(16, 16, Rgba([200, 40, 40, 255])));

    let workers = worker_pool(args.threads)?;

    let start = Instant::now();
    let sets: Vec<LayerSet> = workers.install(|| {
        (0..args.tiles)
            .into_par_iter()
            .map(|index| build_tile(index, &settings, &arena, &textures, &icon))
            .collect()
    });
    log::info!(
        "populated {} tiles on {} threads in {:?}, {:?}",
        sets.len(),
        workers.current_num_threads(),
        start.elapsed(),
        arena.stats()
    );

    let start = Instant::now();
    let mut compiler = BufferCompiler::new();
    let mut surface = HeadlessSurface::default();
    let mut bytes = 0;
    let mut extrusion_bytes = 0;
    for mut set in sets {
        let buffer = compiler.compile(&mut set, &mut surface)?;
        bytes += buffer.bytes().len();
        extrusion_bytes += buffer
            .extrusions
            .iter()
            .map(|e| e.vertex_bytes().len() + e.index_bytes().len())
            .sum::<usize>();
        compiler.recycle(buffer);
        set.clear();
    }
    log::info!(
        "compiled {} KiB of vertices and {} KiB of extrusions in {:?}",
        bytes / 1024,
        extrusion_bytes / 1024,
        start.elapsed()
    );
    log::info!(
        "{} textures uploaded, {} still live, {:?}",
        surface.next,
        surface.live,
        arena.stats()
    );

    if let (Some(path), Some(atlas)) = (&args.atlas, &surface.atlas) {
        match atlas.save(path) {
            Ok(()) => log::info!("wrote atlas tile to {}", path.display()),
            Err(e) => log::error!("cannot write {}: {}", path.display(), e),
        }
    }
    Ok(())
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_pool_uses_the_requested_threads() {
        let pool = worker_pool(Some(3)).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }

    #[test]
    fn missing_settings_file_is_a_vertex_error() {
        let args = Args {
            tiles: 1,
            threads: Some(1),
            settings: Some(PathBuf::from("/nonexistent/vertex-settings.json")),
            atlas: None,
        };
        let result = run(args);
        assert!(matches!(result, Err(DemoError::Vertex(Error::Io(_)))));
    }

    #[test]
    fn synthetic_tiles_compile() {
        let args = Args {
            tiles: 4,
            threads: Some(2),
            settings: None,
            atlas: None,
        };
        assert!(run(args).is_ok());
    }
}
