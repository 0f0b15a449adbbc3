//! Starpoly turns star-convex shape predictions into segmented objects.
//!
//! A shape-regression network predicts, for every pixel, an object
//! probability and the distances from that pixel to the object boundary
//! along `R` evenly spaced rays. Starpoly reconstructs one polygon per pixel
//! above a probability threshold, keeps the best-scoring polygons through
//! greedy polygon non-maximum suppression, and exports the survivors as a
//! label image and/or polygon records. Timelapse stacks are processed frame
//! by frame, optionally in parallel via the `rayon` feature.

mod candidate;
pub mod export;
pub mod geometry;
pub mod image;
pub mod lowlevel;
pub mod pipeline;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use candidate::nms::SuppressionStats;
pub use candidate::Candidate;
pub use export::{LabelImage, LabelStack, PolygonRecord};
pub use geometry::{Box2D, RayTable, StarPolygon};
pub use crate::image::rays::RayView;
pub use crate::image::stack::{Prediction, StackView};
pub use crate::image::{ImageView, OwnedImage};
pub use pipeline::{segment, FrameResult, OutputMode, SegmentConfig, Segmenter, StackResult};
pub use util::{StarPolyError, StarPolyResult};
