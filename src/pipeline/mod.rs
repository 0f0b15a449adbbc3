//! End-to-end segmentation: candidates, suppression, export.
//!
//! Each frame is an independent pure transform of its probability and ray
//! distance maps. A timelapse runs that transform per frame (in parallel
//! with the `rayon` feature and `parallel: true`) and merges the private
//! per-frame results in frame order.

use crate::candidate::build::{build_candidates, check_frame_inputs, BuildParams};
#[cfg(feature = "rayon")]
use crate::candidate::build::build_candidates_par;
use crate::candidate::nms::{suppress, SuppressionStats};
use crate::export::{polygon_records, render_labels, LabelImage, LabelStack, PolygonRecord};
use crate::geometry::RayTable;
use crate::image::rays::RayView;
use crate::image::stack::{Prediction, StackView};
use crate::image::ImageView;
use crate::trace::{trace_event, trace_span};
use crate::util::math::is_unit_interval;
use crate::util::{StarPolyError, StarPolyResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Which representations of the accepted polygons to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Rasterized label image only.
    LabelImage,
    /// Polygon records only.
    Polygons,
    /// Both label image and polygon records.
    Both,
}

impl OutputMode {
    fn labels(self) -> bool {
        matches!(self, OutputMode::LabelImage | OutputMode::Both)
    }

    fn polygons(self) -> bool {
        matches!(self, OutputMode::Polygons | OutputMode::Both)
    }
}

/// Segmentation parameters.
#[derive(Clone, Debug)]
pub struct SegmentConfig {
    /// Rays per pixel in the distance map.
    pub n_rays: usize,
    /// Minimum probability for a pixel to propose a polygon.
    pub prob_thresh: f32,
    /// IoU at or above which a lower-scored polygon is suppressed.
    pub nms_thresh: f32,
    /// Border exclusion margin in pixels (0 disables).
    pub exclude_border: usize,
    /// Outputs to produce.
    pub output: OutputMode,
    /// Enable parallel candidate building and frame processing.
    pub parallel: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            n_rays: 32,
            prob_thresh: 0.55,
            nms_thresh: 0.4,
            exclude_border: 2,
            output: OutputMode::Both,
            parallel: false,
        }
    }
}

impl SegmentConfig {
    /// Validates ray count and thresholds.
    pub fn validate(&self) -> StarPolyResult<()> {
        if self.n_rays < 3 {
            return Err(StarPolyError::TooFewRays {
                n_rays: self.n_rays,
            });
        }
        if !is_unit_interval(self.prob_thresh) {
            return Err(StarPolyError::ThresholdOutOfRange {
                name: "prob_thresh",
                value: self.prob_thresh,
            });
        }
        if !is_unit_interval(self.nms_thresh) {
            return Err(StarPolyError::ThresholdOutOfRange {
                name: "nms_thresh",
                value: self.nms_thresh,
            });
        }
        Ok(())
    }

    fn build_params(&self) -> BuildParams {
        BuildParams {
            prob_thresh: self.prob_thresh,
            exclude_border: self.exclude_border,
        }
    }
}

/// Output of one frame.
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// Frame index for timelapse input, `None` for a single image.
    pub frame: Option<usize>,
    /// Accepted polygons in acceptance order (empty unless requested).
    pub polygons: Vec<PolygonRecord>,
    /// Label image (present when requested).
    pub labels: Option<LabelImage>,
    /// Candidate and suppression counters.
    pub stats: SuppressionStats,
}

/// Output of a timelapse, one entry per frame in frame order.
#[derive(Clone, Debug)]
pub struct StackResult {
    pub frames: Vec<FrameResult>,
}

impl StackResult {
    /// Collects per-frame label images into a stack; `None` if labels were not requested.
    pub fn label_stack(&self) -> StarPolyResult<Option<LabelStack>> {
        let Some(first) = self.frames.first().and_then(|f| f.labels.as_ref()) else {
            return Ok(None);
        };
        let mut stack = LabelStack::new(first.width(), first.height());
        for frame in &self.frames {
            if let Some(labels) = &frame.labels {
                stack.push(labels.clone())?;
            }
        }
        Ok(Some(stack))
    }

    /// Iterates over polygon records of all frames.
    pub fn polygons(&self) -> impl Iterator<Item = &PolygonRecord> {
        self.frames.iter().flat_map(|f| f.polygons.iter())
    }
}

/// Validated configuration plus the ray table it implies.
#[derive(Clone, Debug)]
pub struct Segmenter {
    config: SegmentConfig,
    table: RayTable,
}

impl Segmenter {
    /// Validates `config` and precomputes ray directions.
    pub fn new(config: SegmentConfig) -> StarPolyResult<Self> {
        config.validate()?;
        let table = RayTable::new(config.n_rays)?;
        Ok(Self { config, table })
    }

    /// Replaces the configuration, rebuilding the ray table if `n_rays` changed.
    pub fn with_config(self, config: SegmentConfig) -> StarPolyResult<Self> {
        config.validate()?;
        let table = if config.n_rays == self.table.n_rays() {
            self.table
        } else {
            RayTable::new(config.n_rays)?
        };
        Ok(Self { config, table })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    /// Segments one image.
    pub fn segment_frame(&self, prob: ImageView<'_, f32>, dist: RayView<'_>) -> StarPolyResult<FrameResult> {
        self.run_frame(prob, dist, None)
    }

    /// Segments a timelapse; `dist` stacks `frames * n_rays` channels per pixel.
    ///
    /// Inputs are checked for all frames before any frame is processed. A
    /// failing frame fails the whole call; no partial stack is returned.
    pub fn segment_stack(&self, prob: StackView<'_, f32>, dist: RayView<'_>) -> StarPolyResult<StackResult> {
        if prob.width() != dist.width() || prob.height() != dist.height() {
            return Err(StarPolyError::ExtentMismatch {
                prob_width: prob.width(),
                prob_height: prob.height(),
                dist_width: dist.width(),
                dist_height: dist.height(),
            });
        }
        let n_rays = self.config.n_rays;
        let dist_frames = dist.num_frames(n_rays)?;
        if dist_frames != prob.frames() {
            return Err(StarPolyError::FrameCountMismatch {
                prob_frames: prob.frames(),
                dist_frames,
            });
        }

        let frames = self.map_frames(prob.frames(), |t| {
            self.run_frame(prob.frame(t)?, dist.frame(t, n_rays)?, Some(t))
        })?;
        Ok(StackResult { frames })
    }

    /// Segments `frames` combined predictions stored back to back.
    ///
    /// Each block is `height x width x (1 + n_rays)` with the probability in
    /// channel 0, as produced frame by frame by the network.
    pub fn segment_predictions(
        &self,
        data: &[f32],
        width: usize,
        height: usize,
        frames: usize,
    ) -> StarPolyResult<StackResult> {
        if frames == 0 {
            return Err(StarPolyError::InvalidInput("stack must contain at least one frame"));
        }
        let channels = self.config.n_rays + 1;
        let block = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
            .ok_or(StarPolyError::InvalidDimensions { width, height })?;
        let needed = block
            .checked_mul(frames)
            .ok_or(StarPolyError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(StarPolyError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }

        let frames = self.map_frames(frames, |t| {
            let pred = Prediction::split(&data[t * block..(t + 1) * block], width, height, channels)?;
            self.run_frame(pred.prob(), pred.dist(), Some(t))
        })?;
        Ok(StackResult { frames })
    }

    #[cfg(feature = "rayon")]
    fn map_frames<F>(&self, frames: usize, run: F) -> StarPolyResult<Vec<FrameResult>>
    where
        F: Fn(usize) -> StarPolyResult<FrameResult> + Send + Sync,
    {
        if self.config.parallel {
            (0..frames).into_par_iter().map(run).collect()
        } else {
            (0..frames).map(run).collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn map_frames<F>(&self, frames: usize, run: F) -> StarPolyResult<Vec<FrameResult>>
    where
        F: Fn(usize) -> StarPolyResult<FrameResult>,
    {
        (0..frames).map(run).collect()
    }

    fn run_frame(&self, prob: ImageView<'_, f32>, dist: RayView<'_>, frame: Option<usize>) -> StarPolyResult<FrameResult> {
        let _span = trace_span!(
            "segment_frame",
            frame = frame.unwrap_or(0),
            width = prob.width(),
            height = prob.height()
        )
        .entered();
        check_frame_inputs(prob, dist, self.config.n_rays)?;

        let candidates = self.build(prob, dist)?;
        let (winners, stats) = suppress(candidates, self.config.nms_thresh)?;
        trace_event!(
            "frame_summary",
            frame = frame.unwrap_or(0),
            candidates = stats.candidates,
            winners = stats.winners
        );

        let output = self.config.output;
        let labels = if output.labels() {
            Some(render_labels(&winners, prob.width(), prob.height())?)
        } else {
            None
        };
        let polygons = if output.polygons() {
            polygon_records(&winners, frame)?
        } else {
            Vec::new()
        };
        Ok(FrameResult {
            frame,
            polygons,
            labels,
            stats,
        })
    }

    #[cfg(feature = "rayon")]
    fn build(&self, prob: ImageView<'_, f32>, dist: RayView<'_>) -> StarPolyResult<Vec<crate::Candidate>> {
        if self.config.parallel {
            build_candidates_par(prob, dist, &self.table, self.config.build_params())
        } else {
            build_candidates(prob, dist, &self.table, self.config.build_params())
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn build(&self, prob: ImageView<'_, f32>, dist: RayView<'_>) -> StarPolyResult<Vec<crate::Candidate>> {
        build_candidates(prob, dist, &self.table, self.config.build_params())
    }
}

/// Segments one image with `config`.
pub fn segment(prob: ImageView<'_, f32>, dist: RayView<'_>, config: &SegmentConfig) -> StarPolyResult<FrameResult> {
    Segmenter::new(config.clone())?.segment_frame(prob, dist)
}

#[cfg(test)]
mod tests {
    use super::{OutputMode, SegmentConfig, Segmenter};
    use crate::image::rays::RayView;
    use crate::image::stack::StackView;
    use crate::util::StarPolyError;

    #[test]
    fn default_config_is_valid() {
        let cfg = SegmentConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.n_rays, 32);
        assert_eq!(cfg.exclude_border, 2);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let cfg = SegmentConfig {
            n_rays: 2,
            ..SegmentConfig::default()
        };
        assert_eq!(
            Segmenter::new(cfg).err().unwrap(),
            StarPolyError::TooFewRays { n_rays: 2 }
        );
        let cfg = SegmentConfig {
            prob_thresh: -0.1,
            ..SegmentConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(StarPolyError::ThresholdOutOfRange {
                name: "prob_thresh",
                ..
            })
        ));
    }

    #[test]
    fn with_config_rebuilds_ray_table() {
        let seg = Segmenter::new(SegmentConfig::default()).unwrap();
        let seg = seg
            .with_config(SegmentConfig {
                n_rays: 8,
                ..SegmentConfig::default()
            })
            .unwrap();
        assert_eq!(seg.table.n_rays(), 8);
        assert!(seg
            .with_config(SegmentConfig {
                nms_thresh: f32::NAN,
                ..SegmentConfig::default()
            })
            .is_err());
    }

    #[test]
    fn short_prediction_buffer_is_rejected() {
        let seg = Segmenter::new(SegmentConfig {
            n_rays: 4,
            ..SegmentConfig::default()
        })
        .unwrap();
        let data = vec![0.0f32; 3 * 3 * 5 * 2 - 1];
        let err = seg.segment_predictions(&data, 3, 3, 2).err().unwrap();
        assert_eq!(err, StarPolyError::BufferTooSmall { needed: 90, got: 89 });
    }

    #[test]
    fn stack_frame_count_must_match() {
        let prob = vec![0.0f32; 4 * 4 * 2];
        let dist = vec![1.0f32; 4 * 4 * 3 * 3];
        let seg = Segmenter::new(SegmentConfig {
            n_rays: 3,
            exclude_border: 0,
            output: OutputMode::Polygons,
            ..SegmentConfig::default()
        })
        .unwrap();
        let err = seg
            .segment_stack(
                StackView::new(&prob, 4, 4, 2).unwrap(),
                RayView::new(&dist, 4, 4, 9).unwrap(),
            )
            .err()
            .unwrap();
        assert_eq!(
            err,
            StarPolyError::FrameCountMismatch {
                prob_frames: 2,
                dist_frames: 3
            }
        );
    }
}
