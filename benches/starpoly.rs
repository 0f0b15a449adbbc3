use criterion::{criterion_group, criterion_main, Criterion};
use starpoly::lowlevel::{build_candidates, suppress, BuildParams};
use starpoly::{ImageView, RayTable, RayView, SegmentConfig, Segmenter, StarPolygon};
use std::hint::black_box;

const N_RAYS: usize = 32;

/// Grid of soft blobs with slightly irregular ray distances.
fn make_maps(width: usize, height: usize, pitch: usize) -> (Vec<f32>, Vec<f32>) {
    let half = pitch as f32 / 2.0;
    let mut prob = Vec::with_capacity(width * height);
    let mut dist = Vec::with_capacity(width * height * N_RAYS);
    for y in 0..height {
        for x in 0..width {
            let dx = (x % pitch) as f32 - half;
            let dy = (y % pitch) as f32 - half;
            prob.push((1.0 - (dx * dx + dy * dy).sqrt() / half).max(0.0));
            for k in 0..N_RAYS {
                let jitter = ((x * 7 + y * 3 + k * 11) % 9) as f32 * 0.15;
                dist.push(0.6 * half + jitter);
            }
        }
    }
    (prob, dist)
}

fn bench_segment(c: &mut Criterion) {
    let (width, height) = (512, 512);
    let (prob, dist) = make_maps(width, height, 24);
    let prob_view = ImageView::from_slice(&prob, width, height).unwrap();
    let dist_view = RayView::new(&dist, width, height, N_RAYS).unwrap();
    let table = RayTable::new(N_RAYS).unwrap();
    let params = BuildParams {
        prob_thresh: 0.55,
        exclude_border: 2,
    };

    c.bench_function("build_candidates_512", |b| {
        b.iter(|| black_box(build_candidates(prob_view, dist_view, &table, params).unwrap()));
    });

    let candidates = build_candidates(prob_view, dist_view, &table, params).unwrap();
    c.bench_function("suppress_512", |b| {
        b.iter(|| black_box(suppress(candidates.clone(), 0.4).unwrap()));
    });

    let seq = Segmenter::new(SegmentConfig::default()).unwrap();
    c.bench_function("segment_frame_512", |b| {
        b.iter(|| black_box(seq.segment_frame(prob_view, dist_view).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let par = Segmenter::new(SegmentConfig {
            parallel: true,
            ..SegmentConfig::default()
        })
        .unwrap();
        c.bench_function("segment_frame_512_parallel", |b| {
            b.iter(|| black_box(par.segment_frame(prob_view, dist_view).unwrap()));
        });
    }
}

fn bench_overlap(c: &mut Criterion) {
    let table = RayTable::new(N_RAYS).unwrap();
    let dists: Vec<f32> = (0..N_RAYS).map(|k| 6.0 + (k % 5) as f32 * 0.4).collect();
    let a = StarPolygon::from_rays([20.0, 20.0], &dists, &table).unwrap();
    let b = StarPolygon::from_rays([23.5, 21.0], &dists, &table).unwrap();

    c.bench_function("polygon_iou_32", |bench| {
        bench.iter(|| black_box(black_box(&a).iou(black_box(&b))));
    });
}

criterion_group!(benches, bench_segment, bench_overlap);
criterion_main!(benches);
