use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use vsearch_core::{DifferenceType, ExperimentState, ObjectCount, TrialParameters};
use vsearch_experiment::{RngSource, StimulusGenerator};
use vsearch_render::{SceneView, SkiaRenderer};

fn harness(count: ObjectCount) -> (SkiaRenderer, vsearch_core::StimulusLayout) {
    let renderer = SkiaRenderer::new(1280, 720, 56.0).expect("canvas");
    let mut rng = RngSource(StdRng::seed_from_u64(11));
    let params = TrialParameters {
        difference_type: DifferenceType::new("SizeOpacity"),
        object_count: count,
    };
    let layout = StimulusGenerator::default().generate(&params, &mut rng);
    (renderer, layout)
}

pub fn bench_shapes(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_layout");
    g.sample_size(60);

    for count in [ObjectCount::Low, ObjectCount::Medium, ObjectCount::High] {
        g.bench_function(format!("shapes_{count}"), |b| {
            b.iter_batched_ref(
                || harness(count),
                |(r, layout)| {
                    let view = SceneView {
                        state: ExperimentState::Shapes,
                        layout: Some(&*layout),
                        progress: Some((3, 40)),
                        notice: None,
                    };
                    r.render(black_box(&view)).unwrap();
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

pub fn bench_placeholders_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(60);

    g.bench_function("placeholders_high", |b| {
        let (mut r, layout) = harness(ObjectCount::High);
        let mut frame = vec![0u8; 1280 * 720 * 4];
        b.iter(|| {
            let view = SceneView {
                state: ExperimentState::Placeholders,
                layout: Some(&layout),
                progress: None,
                notice: None,
            };
            let stats = r.render_frame(&view, &mut frame).unwrap();
            black_box(stats.total);
        })
    });
    g.finish();
}

pub fn bench_hit_test(c: &mut Criterion) {
    let (r, layout) = harness(ObjectCount::High);
    let (ox, oy) = r.grid_origin(&layout);
    c.bench_function("hit_test_last_cell", |b| {
        b.iter(|| r.hit_test(black_box(&layout), black_box((ox + 360.0, oy + 360.0))))
    });
}

criterion_group!(benches, bench_shapes, bench_placeholders_frame, bench_hit_test);
criterion_main!(benches);
