//! Polygon candidates: construction from dense maps and greedy suppression.

pub(crate) mod build;
pub(crate) mod nms;

use crate::geometry::{Box2D, StarPolygon};
use std::cmp::Ordering;

/// A star-convex polygon proposed by one pixel of the probability map.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Column of the origin pixel.
    pub x: usize,
    /// Row of the origin pixel.
    pub y: usize,
    /// Probability at the origin pixel.
    pub score: f32,
    /// Polygon reconstructed from the origin pixel's rays.
    pub polygon: StarPolygon,
    /// Integer bounding box of `polygon`.
    pub bbox: Box2D,
}

/// Descending score; ties fall back to row-major enumeration order.
pub(crate) fn candidate_cmp_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sorts candidates by descending score with deterministic tie-breaking.
pub(crate) fn sort_candidates_desc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_desc);
}
