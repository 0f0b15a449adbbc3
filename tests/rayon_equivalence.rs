#![cfg(feature = "rayon")]

use starpoly::lowlevel::{build_candidates, build_candidates_par, BuildParams};
use starpoly::{ImageView, RayTable, RayView, SegmentConfig, Segmenter, StackView};

const N_RAYS: usize = 16;

/// Blobby probability map with rays that vary per pixel.
fn make_maps(width: usize, height: usize, n_rays: usize, seed: usize) -> (Vec<f32>, Vec<f32>) {
    let mut prob = Vec::with_capacity(width * height);
    let mut dist = Vec::with_capacity(width * height * n_rays);
    for y in 0..height {
        for x in 0..width {
            let cell = ((x / 12) * 7 + (y / 12) * 13 + seed) % 5;
            let (dx, dy) = ((x % 12) as f32 - 6.0, (y % 12) as f32 - 6.0);
            let p = 1.0 - (dx * dx + dy * dy).sqrt() / 6.0;
            prob.push(if cell == 0 { 0.0 } else { p.max(0.0) });
            for k in 0..n_rays {
                let jitter = ((x * 31 + y * 17 + k * 5 + seed) % 11) as f32 * 0.1;
                dist.push(3.0 + jitter);
            }
        }
    }
    (prob, dist)
}

#[test]
fn parallel_build_matches_sequential() {
    let (width, height) = (96, 80);
    let (prob, dist) = make_maps(width, height, N_RAYS, 0);
    let prob_view = ImageView::from_slice(&prob, width, height).unwrap();
    let dist_view = RayView::new(&dist, width, height, N_RAYS).unwrap();
    let table = RayTable::new(N_RAYS).unwrap();
    let params = BuildParams {
        prob_thresh: 0.4,
        exclude_border: 2,
    };

    let seq = build_candidates(prob_view, dist_view, &table, params).unwrap();
    let par = build_candidates_par(prob_view, dist_view, &table, params).unwrap();
    assert!(!seq.is_empty());
    assert_eq!(seq, par);
}

#[test]
fn parallel_frame_matches_sequential() {
    let (width, height) = (96, 80);
    let (prob, dist) = make_maps(width, height, N_RAYS, 1);
    let prob_view = ImageView::from_slice(&prob, width, height).unwrap();
    let dist_view = RayView::new(&dist, width, height, N_RAYS).unwrap();

    let base = SegmentConfig {
        n_rays: N_RAYS,
        prob_thresh: 0.4,
        ..SegmentConfig::default()
    };
    let seq = Segmenter::new(SegmentConfig {
        parallel: false,
        ..base.clone()
    })
    .unwrap()
    .segment_frame(prob_view, dist_view)
    .unwrap();
    let par = Segmenter::new(SegmentConfig {
        parallel: true,
        ..base
    })
    .unwrap()
    .segment_frame(prob_view, dist_view)
    .unwrap();

    assert!(!seq.polygons.is_empty());
    assert_eq!(seq.polygons, par.polygons);
    assert_eq!(seq.labels, par.labels);
    assert_eq!(seq.stats, par.stats);
}

#[test]
fn parallel_stack_preserves_frame_order() {
    let (width, height) = (48, 48);
    let frames = 4;
    let mut prob = Vec::new();
    let mut per_frame_dist = Vec::new();
    for t in 0..frames {
        let (p, d) = make_maps(width, height, N_RAYS, t * 3);
        prob.extend(p);
        per_frame_dist.push(d);
    }
    let mut dist = Vec::with_capacity(width * height * N_RAYS * frames);
    for pixel in 0..width * height {
        for d in &per_frame_dist {
            dist.extend_from_slice(&d[pixel * N_RAYS..(pixel + 1) * N_RAYS]);
        }
    }
    let prob_view = StackView::new(&prob, width, height, frames).unwrap();
    let dist_view = RayView::new(&dist, width, height, N_RAYS * frames).unwrap();

    let base = SegmentConfig {
        n_rays: N_RAYS,
        prob_thresh: 0.4,
        ..SegmentConfig::default()
    };
    let seq = Segmenter::new(base.clone())
        .unwrap()
        .segment_stack(prob_view, dist_view)
        .unwrap();
    let par = Segmenter::new(SegmentConfig {
        parallel: true,
        ..base
    })
    .unwrap()
    .segment_stack(prob_view, dist_view)
    .unwrap();

    assert_eq!(par.frames.len(), frames);
    for (t, (a, b)) in seq.frames.iter().zip(&par.frames).enumerate() {
        assert_eq!(a.frame, Some(t));
        assert_eq!(b.frame, Some(t));
        assert_eq!(a.polygons, b.polygons);
        assert_eq!(a.labels, b.labels);
    }
}
