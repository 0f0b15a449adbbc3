//! Building blocks for custom pipelines.
//!
//! These expose the individual stages behind [`Segmenter`](crate::Segmenter):
//! candidate construction, suppression and rasterization. Most users should
//! prefer [`segment`](crate::segment) or `Segmenter`.

pub use crate::candidate::build::{build_candidates, BuildParams};
#[cfg(feature = "rayon")]
pub use crate::candidate::build::build_candidates_par;
pub use crate::candidate::nms::{suppress, SuppressionStats};
pub use crate::export::{paint_polygon, polygon_records, render_labels};
