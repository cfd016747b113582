use criterion::{black_box, criterion_group, criterion_main, Criterion};
use layerview_settings::Config;
use layerview_visualizer::{GCodeMemoryFile, GCodeRenderer, HeadlessBackend, RenderInfo};
use std::fmt::Write;
use std::sync::Arc;

/// Square perimeters stacked into `layers` layers
fn synthetic_gcode(layers: usize, moves_per_layer: usize) -> String {
    let mut text = String::from("; filament_diameter = 1.75\nG90\n");
    let mut e = 0.0;
    for layer in 0..layers {
        let _ = writeln!(text, ";LAYER:{}", layer);
        let _ = writeln!(text, "G1 Z{:.2} F3000", 0.2 * (layer + 1) as f64);
        for i in 0..moves_per_layer {
            let (x, y) = match i % 4 {
                0 => (0.0, 0.0),
                1 => (20.0, 0.0),
                2 => (20.0, 20.0),
                _ => (0.0, 20.0),
            };
            e += 0.8;
            let feed = 1200 + (i % 3) * 600;
            let _ = writeln!(text, "G1 X{:.1} Y{:.1} E{:.3} F{}", x, y, e, feed);
        }
        let _ = writeln!(text, "G1 E{:.3} F2400", e - 1.0);
        let _ = writeln!(text, "G1 E{:.3}", e);
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let text = synthetic_gcode(50, 400);
    c.bench_function("parse_50_layers", |b| {
        b.iter(|| GCodeMemoryFile::parse(black_box(&text)))
    });
}

fn bench_extraction(c: &mut Criterion) {
    let source = Arc::new(GCodeMemoryFile::parse(&synthetic_gcode(50, 400)));
    let config = Config::default();

    c.bench_function("extract_all_layers", |b| {
        b.iter(|| {
            let mut renderer = GCodeRenderer::new(Some(source.clone()), &config);
            let total: usize = (0..renderer.layer_count())
                .map(|layer| renderer.num_features(layer))
                .sum();
            black_box(total)
        })
    });
}

fn bench_geometry_build(c: &mut Criterion) {
    let source = Arc::new(GCodeMemoryFile::parse(&synthetic_gcode(20, 400)));
    let config = Config::default();

    c.bench_function("build_3d_geometry", |b| {
        b.iter(|| {
            let mut renderer = GCodeRenderer::new(Some(source.clone()), &config);
            let mut backend = HeadlessBackend::new();
            let info = RenderInfo::new(0, renderer.layer_count());
            let report = renderer.render_3d(&mut backend, &info);
            renderer.dispose(&mut backend);
            black_box(report)
        })
    });
}

criterion_group!(benches, bench_parse, bench_extraction, bench_geometry_build);
criterion_main!(benches);
