//! Greedy polygon non-maximum suppression.
//!
//! Candidates are visited in descending score order. A candidate that has not
//! been suppressed when its turn comes is accepted and suppresses every
//! later candidate whose polygon IoU with it reaches the threshold.
//! Suppressed candidates never suppress others. A bucket grid limits the
//! pairs that reach the inclusive box test, and only box-intersecting pairs
//! pay for the exact polygon overlap.

use crate::candidate::{sort_candidates_desc, Candidate};
use crate::geometry::grid::BucketGrid;
use crate::trace::{trace_event, trace_span};
use crate::util::math::is_unit_interval;
use crate::util::{StarPolyError, StarPolyResult};

/// Counters collected during one suppression sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SuppressionStats {
    /// Candidates entering suppression.
    pub candidates: usize,
    /// Candidates accepted.
    pub winners: usize,
    /// Exact polygon overlap evaluations.
    pub overlap_tests: usize,
    /// Nearby pairs discarded by the bounding-box test.
    pub bbox_rejections: usize,
}

fn bucket_size(candidates: &[Candidate]) -> i64 {
    if candidates.is_empty() {
        return 1;
    }
    let total = candidates
        .iter()
        .map(|c| (c.bbox.xmax() - c.bbox.xmin()).max(c.bbox.ymax() - c.bbox.ymin()))
        .fold(0i64, i64::saturating_add);
    (total / candidates.len() as i64 + 1).max(4)
}

fn filled<T: Clone>(value: T, n: usize) -> StarPolyResult<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(n)
        .map_err(|_| StarPolyError::CapacityExceeded { requested: n })?;
    out.resize(n, value);
    Ok(out)
}

/// Runs greedy suppression and returns the winners in acceptance order.
///
/// Acceptance order is descending score with ties in row-major origin order.
pub fn suppress(
    mut candidates: Vec<Candidate>,
    nms_thresh: f32,
) -> StarPolyResult<(Vec<Candidate>, SuppressionStats)> {
    if !is_unit_interval(nms_thresh) {
        return Err(StarPolyError::ThresholdOutOfRange {
            name: "nms_thresh",
            value: nms_thresh,
        });
    }
    let _span = trace_span!("suppress", candidates = candidates.len()).entered();

    sort_candidates_desc(&mut candidates);
    let n = candidates.len();
    let thresh = f64::from(nms_thresh);
    let mut boxes = Vec::new();
    boxes
        .try_reserve_exact(n)
        .map_err(|_| StarPolyError::CapacityExceeded { requested: n })?;
    boxes.extend(candidates.iter().map(|c| c.bbox));
    let grid = BucketGrid::build(&boxes, bucket_size(&candidates));

    let mut stats = SuppressionStats {
        candidates: n,
        ..SuppressionStats::default()
    };
    let mut suppressed = filled(false, n)?;
    // Last winner position (plus one) that visited each candidate.
    let mut seen = filled(0usize, n)?;

    for i in 0..n {
        if suppressed[i] {
            continue;
        }
        stats.winners += 1;
        let winner = &candidates[i];
        grid.for_each_near(&winner.bbox, |j| {
            if j <= i || suppressed[j] || seen[j] == i + 1 {
                return;
            }
            seen[j] = i + 1;
            let other = &candidates[j];
            if !winner.bbox.does_intersect(&other.bbox) {
                stats.bbox_rejections += 1;
                return;
            }
            stats.overlap_tests += 1;
            if winner.polygon.iou(&other.polygon) >= thresh {
                suppressed[j] = true;
            }
        });
    }

    let winners: Vec<Candidate> = candidates
        .into_iter()
        .zip(suppressed)
        .filter_map(|(c, s)| (!s).then_some(c))
        .collect();

    trace_event!(
        "suppression",
        winners = stats.winners,
        overlap_tests = stats.overlap_tests,
        bbox_rejections = stats.bbox_rejections
    );
    Ok((winners, stats))
}

#[cfg(test)]
mod tests {
    use super::suppress;
    use crate::candidate::{sort_candidates_desc, Candidate};
    use crate::geometry::{RayTable, StarPolygon};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn candidate(x: usize, y: usize, score: f32, dists: &[f32]) -> Candidate {
        let table = RayTable::new(dists.len()).unwrap();
        let polygon = StarPolygon::from_rays([x as f64, y as f64], dists, &table).unwrap();
        let bbox = polygon.bbox().unwrap();
        Candidate {
            x,
            y,
            score,
            polygon,
            bbox,
        }
    }

    /// Plain quadratic sweep used as a reference for the grid-pruned one.
    fn suppress_exhaustive(mut candidates: Vec<Candidate>, thresh: f32) -> Vec<Candidate> {
        sort_candidates_desc(&mut candidates);
        let mut suppressed = vec![false; candidates.len()];
        for i in 0..candidates.len() {
            if suppressed[i] {
                continue;
            }
            for j in i + 1..candidates.len() {
                if suppressed[j] || !candidates[i].bbox.does_intersect(&candidates[j].bbox) {
                    continue;
                }
                if candidates[i].polygon.iou(&candidates[j].polygon) >= f64::from(thresh) {
                    suppressed[j] = true;
                }
            }
        }
        candidates
            .into_iter()
            .zip(suppressed)
            .filter_map(|(c, s)| (!s).then_some(c))
            .collect()
    }

    #[test]
    fn identical_polygons_keep_higher_score() {
        let a = candidate(10, 10, 0.8, &[3.0; 8]);
        let b = candidate(10, 10, 0.9, &[3.0; 8]);
        let (winners, stats) = suppress(vec![a, b], 0.5).unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].score, 0.9);
        assert_eq!(stats.overlap_tests, 1);
    }

    #[test]
    fn suppressed_candidates_do_not_suppress() {
        // b overlaps both a and c heavily; a and c barely overlap.
        let a = candidate(10, 10, 0.9, &[4.0; 32]);
        let b = candidate(13, 10, 0.8, &[4.0; 32]);
        let c = candidate(16, 10, 0.7, &[4.0; 32]);
        assert!(b.polygon.iou(&c.polygon) > 0.3);
        assert!(a.polygon.iou(&c.polygon) < 0.3);
        let (winners, _) = suppress(vec![c, b, a], 0.3).unwrap();
        let kept: Vec<_> = winners.iter().map(|w| w.x).collect();
        assert_eq!(kept, vec![10, 16]);
    }

    #[test]
    fn zero_rays_still_suppress_by_true_overlap() {
        let dists = [0.0, 1.0, 3.0, 4.0, 4.0, 1.0, 0.0, 5.0];
        let a = candidate(3, 3, 0.9, &dists);
        let b = candidate(2, 4, 0.8, &dists);
        let (winners, _) = suppress(vec![a.clone(), b.clone()], 0.3).unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!((winners[0].x, winners[0].y), (3, 3));
        let (winners, _) = suppress(vec![a, b], 0.35).unwrap();
        assert_eq!(winners.len(), 2);
    }

    #[test]
    fn boxes_near_coordinate_limit_do_not_overflow() {
        let a = candidate(0, 0, 0.9, &[1.0e9; 4]);
        let b = candidate(5, 5, 0.8, &[1.0e9; 4]);
        let c = candidate(9, 2, 0.7, &[1.0; 4]);
        let (winners, stats) = suppress(vec![a, b, c], 0.5).unwrap();
        assert_eq!(winners.len(), 2);
        assert_eq!(stats.overlap_tests, 2);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        assert!(suppress(Vec::new(), 1.5).is_err());
        assert!(suppress(Vec::new(), f32::NAN).is_err());
        let (winners, stats) = suppress(Vec::new(), 0.4).unwrap();
        assert!(winners.is_empty());
        assert_eq!(stats.winners, 0);
    }

    #[test]
    fn grid_pruning_matches_exhaustive_sweep() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut candidates = Vec::new();
        for _ in 0..300 {
            let x = rng.random_range(5..195);
            let y = rng.random_range(5..195);
            let dists: Vec<f32> = (0..16).map(|_| rng.random_range(1.0..9.0)).collect();
            candidates.push(candidate(x, y, rng.random_range(0.0..1.0), &dists));
        }
        for thresh in [0.0, 0.2, 0.5, 0.9] {
            let (fast, _) = suppress(candidates.clone(), thresh).unwrap();
            let slow = suppress_exhaustive(candidates.clone(), thresh);
            assert_eq!(fast, slow, "threshold {thresh}");
        }
    }
}
