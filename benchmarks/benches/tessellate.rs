use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use maplibre_vertex::{
    geometry::GeometryBuffer,
    render::{arena::VertexArena, layer::LineLayer, layer::PolygonLayer},
    settings::VertexSettings,
    style::{Cap, LineStyle},
    tessellation::{
        extrusion::{BuildingExtruder, ExtrusionLayer},
        line::LineStroker,
        polygon::PolygonTessellator,
        triangulator::EarcutTriangulator,
    },
};

fn wavy_lines(runs: usize, points: usize) -> GeometryBuffer {
    let mut geometry = GeometryBuffer::new();
    for run in 0..runs {
        geometry.start_run();
        for i in 0..points {
            let x = i as f32 * 256.0 / points as f32;
            let y = (run * 16 % 256) as f32 + (i as f32 * 0.7).sin() * 10.0;
            geometry.add_point(x, y);
        }
    }
    geometry
}

fn footprints(count: usize) -> GeometryBuffer {
    let mut geometry = GeometryBuffer::new();
    for i in 0..count {
        let x = (i % 16) as f32 * 16.0;
        let y = (i / 16) as f32 * 16.0;
        geometry.start_polygon();
        geometry.add_point(x, y);
        geometry.add_point(x + 10.0, y);
        geometry.add_point(x + 10.0, y + 6.0);
        geometry.add_point(x + 5.0, y + 6.0);
        geometry.add_point(x + 5.0, y + 12.0);
        geometry.add_point(x, y + 12.0);
    }
    geometry
}

fn tessellate(c: &mut Criterion) {
    let settings = VertexSettings::default();
    let arena = Arc::new(VertexArena::new(settings.pool_limit));

    let lines = wavy_lines(64, 128);
    let stroker = LineStroker::new(&settings);
    for cap in [Cap::Butt, Cap::Round] {
        c.bench_function(&format!("stroke_{:?}", cap).to_lowercase(), |b| {
            b.iter(|| {
                let mut layer = LineLayer::new(0, arena.clone());
                layer.set_style(LineStyle::new([0; 4], 1.0, cap));
                stroker.stroke(&mut layer, black_box(&lines), false);
                layer.layer.vertex_count()
            })
        });
    }

    let tessellator = PolygonTessellator::new(&settings);
    c.bench_function("fill", |b| {
        b.iter(|| {
            let mut layer = PolygonLayer::new(0, arena.clone());
            tessellator.fill(&mut layer, black_box(&lines));
            layer.layer.vertex_count()
        })
    });

    let buildings = footprints(256);
    let triangulator = EarcutTriangulator;
    let extruder = BuildingExtruder::new(&settings, &triangulator);
    c.bench_function("extrude", |b| {
        b.iter(|| {
            let mut layer = ExtrusionLayer::new(0, [0; 4], arena.clone());
            extruder.extrude(&mut layer, black_box(&buildings), 20.0, 0.0);
            layer.index_count()
        })
    });
}

criterion_group!(benches, tessellate);
criterion_main!(benches);
