//! Candidate construction from probability and ray distance maps.
//!
//! Every pixel whose probability reaches the threshold proposes the polygon
//! described by its rays. Candidates whose box reaches within the exclusion
//! margin of the image border are dropped. Rows are independent, so the
//! `rayon` variant builds rows in parallel and concatenates them in row order.

use crate::candidate::Candidate;
use crate::geometry::{RayTable, StarPolygon};
use crate::image::rays::RayView;
use crate::image::ImageView;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{StarPolyError, StarPolyResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Thresholds applied while building candidates.
#[derive(Clone, Copy, Debug)]
pub struct BuildParams {
    /// Minimum probability for a pixel to propose a polygon.
    pub prob_thresh: f32,
    /// Border exclusion margin in pixels; zero disables the filter.
    pub exclude_border: usize,
}

/// Checks that probability and distance maps describe one frame with `n_rays` rays.
pub(crate) fn check_frame_inputs(
    prob: ImageView<'_, f32>,
    dist: RayView<'_>,
    n_rays: usize,
) -> StarPolyResult<()> {
    if prob.width() != dist.width() || prob.height() != dist.height() {
        return Err(StarPolyError::ExtentMismatch {
            prob_width: prob.width(),
            prob_height: prob.height(),
            dist_width: dist.width(),
            dist_height: dist.height(),
        });
    }
    let frames = dist.num_frames(n_rays)?;
    if frames != 1 {
        return Err(StarPolyError::FrameCountMismatch {
            prob_frames: 1,
            dist_frames: frames,
        });
    }
    Ok(())
}

fn build_row(
    prob: ImageView<'_, f32>,
    dist: RayView<'_>,
    table: &RayTable,
    params: BuildParams,
    y: usize,
) -> StarPolyResult<(Vec<Candidate>, usize)> {
    let width = prob.width();
    let height = prob.height();
    let row = prob.row(y).ok_or(StarPolyError::IndexOutOfBounds {
        index: y,
        len: height,
        context: "row",
    })?;
    let mut out = Vec::new();
    let mut rejected = 0usize;
    for (x, &score) in row.iter().enumerate() {
        if !(score >= params.prob_thresh) {
            continue;
        }
        let rays = dist.rays(x, y).ok_or(StarPolyError::IndexOutOfBounds {
            index: x,
            len: width,
            context: "column",
        })?;
        if let Some((ray, &value)) = rays
            .iter()
            .enumerate()
            .find(|(_, d)| !d.is_finite() || **d < 0.0)
        {
            return Err(StarPolyError::InvalidDistance { x, y, ray, value });
        }
        let polygon = StarPolygon::from_rays([x as f64, y as f64], rays, table)?;
        let Some(bbox) = polygon.bbox() else {
            let (ray, value) = rays
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap_or((0, 0.0));
            return Err(StarPolyError::InvalidDistance { x, y, ray, value });
        };
        if params.exclude_border > 0 && !bbox.within_margin(width, height, params.exclude_border) {
            trace_debug!("border_reject", x = x, y = y);
            rejected += 1;
            continue;
        }
        out.try_reserve(1)
            .map_err(|_| StarPolyError::CapacityExceeded {
                requested: out.len() + 1,
            })?;
        out.push(Candidate {
            x,
            y,
            score,
            polygon,
            bbox,
        });
    }
    Ok((out, rejected))
}

fn concat_rows(rows: Vec<(Vec<Candidate>, usize)>) -> StarPolyResult<Vec<Candidate>> {
    let total: usize = rows.iter().map(|(r, _)| r.len()).sum();
    let rejected: usize = rows.iter().map(|(_, n)| n).sum();
    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| StarPolyError::CapacityExceeded { requested: total })?;
    for (row, _) in rows {
        out.extend(row);
    }
    trace_event!("candidates", count = total, border_rejected = rejected);
    Ok(out)
}

/// Builds all candidates of one frame in row-major order.
pub fn build_candidates(
    prob: ImageView<'_, f32>,
    dist: RayView<'_>,
    table: &RayTable,
    params: BuildParams,
) -> StarPolyResult<Vec<Candidate>> {
    check_frame_inputs(prob, dist, table.n_rays())?;
    let _span = trace_span!("build_candidates", width = prob.width(), height = prob.height()).entered();
    let rows = (0..prob.height())
        .map(|y| build_row(prob, dist, table, params, y))
        .collect::<StarPolyResult<Vec<_>>>()?;
    concat_rows(rows)
}

/// Row-parallel variant of [`build_candidates`] with identical output order.
#[cfg(feature = "rayon")]
pub fn build_candidates_par(
    prob: ImageView<'_, f32>,
    dist: RayView<'_>,
    table: &RayTable,
    params: BuildParams,
) -> StarPolyResult<Vec<Candidate>> {
    check_frame_inputs(prob, dist, table.n_rays())?;
    let _span = trace_span!(
        "build_candidates",
        width = prob.width(),
        height = prob.height(),
        parallel = true
    )
    .entered();
    let rows = (0..prob.height())
        .into_par_iter()
        .map(|y| build_row(prob, dist, table, params, y))
        .collect::<StarPolyResult<Vec<_>>>()?;
    concat_rows(rows)
}
