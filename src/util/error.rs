//! Error types for starpoly.

use thiserror::Error;

/// Result alias for starpoly operations.
pub type StarPolyResult<T> = std::result::Result<T, StarPolyError>;

/// Errors that can occur when building, suppressing or exporting polygons.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StarPolyError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero, or their product overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Box corners violate `xmin <= xmax` or `ymin <= ymax`.
    #[error("invalid box: x in [{xmin}, {xmax}), y in [{ymin}, {ymax})")]
    InvalidBox {
        xmin: i64,
        xmax: i64,
        ymin: i64,
        ymax: i64,
    },
    /// Fewer than three rays cannot enclose any area.
    #[error("at least 3 rays are required, got {n_rays}")]
    TooFewRays { n_rays: usize },
    /// A threshold is NaN or outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },
    /// The distance grid channel count is not a multiple of the ray count.
    #[error("distance channels ({channels}) are not divisible by the ray count ({n_rays})")]
    ChannelsNotDivisible { channels: usize, n_rays: usize },
    /// Probability and distance grids have different spatial extents.
    #[error(
        "probability map is {prob_width}x{prob_height} but distance map is {dist_width}x{dist_height}"
    )]
    ExtentMismatch {
        prob_width: usize,
        prob_height: usize,
        dist_width: usize,
        dist_height: usize,
    },
    /// Probability and distance inputs disagree on the number of frames.
    #[error("probability input has {prob_frames} frames but distance input has {dist_frames}")]
    FrameCountMismatch {
        prob_frames: usize,
        dist_frames: usize,
    },
    /// A ray distance is negative, not finite, or places a vertex beyond the
    /// supported coordinate range.
    #[error("invalid distance {value} at ({x}, {y}) ray {ray}")]
    InvalidDistance {
        x: usize,
        y: usize,
        ray: usize,
        value: f32,
    },
    /// Storage for candidates or labels could not be allocated.
    #[error("cannot allocate storage for {requested} elements")]
    CapacityExceeded { requested: usize },
    /// More objects than the label pixel type can represent.
    #[error("{count} objects do not fit into labels with maximum {max}")]
    LabelOverflow { count: usize, max: u64 },
    /// An index is outside the valid range for the given context.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// Image decoding or encoding failed.
    #[error("image I/O failed: {reason}")]
    ImageIo { reason: String },
}
