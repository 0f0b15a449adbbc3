//! Integer axis-aligned bounding boxes.

use crate::util::{StarPolyError, StarPolyResult};

/// Largest supported coordinate magnitude; keeps every area and span in `i64`.
pub const COORD_LIMIT: i64 = 1 << 30;

/// Axis-aligned box with inclusive minima and exclusive maxima.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Box2D {
    xmin: i64,
    xmax: i64,
    ymin: i64,
    ymax: i64,
}

impl Box2D {
    /// Creates a box, rejecting `xmin > xmax`, `ymin > ymax` and coordinates
    /// beyond [`COORD_LIMIT`].
    pub fn new(xmin: i64, xmax: i64, ymin: i64, ymax: i64) -> StarPolyResult<Self> {
        let in_range = [xmin, xmax, ymin, ymax]
            .iter()
            .all(|v| (-COORD_LIMIT..=COORD_LIMIT).contains(v));
        if xmin > xmax || ymin > ymax || !in_range {
            return Err(StarPolyError::InvalidBox {
                xmin,
                xmax,
                ymin,
                ymax,
            });
        }
        Ok(Self {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// Smallest integer box enclosing `points` (floor of minima, ceil of maxima).
    ///
    /// Returns `None` for an empty slice or for coordinates that are not
    /// finite or exceed [`COORD_LIMIT`].
    pub fn enclosing(points: &[[f64; 2]]) -> Option<Self> {
        let first = points.first()?;
        let (mut x0, mut x1, mut y0, mut y1) = (first[0], first[0], first[1], first[1]);
        for p in &points[1..] {
            x0 = x0.min(p[0]);
            x1 = x1.max(p[0]);
            y0 = y0.min(p[1]);
            y1 = y1.max(p[1]);
        }
        let limit = COORD_LIMIT as f64;
        if ![x0, x1, y0, y1].iter().all(|v| v.is_finite() && v.abs() <= limit) {
            return None;
        }
        Some(Self {
            xmin: x0.floor() as i64,
            xmax: x1.ceil() as i64,
            ymin: y0.floor() as i64,
            ymax: y1.ceil() as i64,
        })
    }

    pub fn xmin(&self) -> i64 {
        self.xmin
    }

    pub fn xmax(&self) -> i64 {
        self.xmax
    }

    pub fn ymin(&self) -> i64 {
        self.ymin
    }

    pub fn ymax(&self) -> i64 {
        self.ymax
    }

    /// `(xmax - xmin) * (ymax - ymin)`; zero for degenerate boxes.
    pub fn area(&self) -> i64 {
        (self.xmax - self.xmin) * (self.ymax - self.ymin)
    }

    /// Area of the overlap rectangle, zero unless it has positive extent.
    pub fn intersection_area(&self, other: &Box2D) -> i64 {
        let ixmin = self.xmin.max(other.xmin);
        let ixmax = self.xmax.min(other.xmax);
        let iymin = self.ymin.max(other.ymin);
        let iymax = self.ymax.min(other.ymax);
        if ixmin < ixmax && iymin < iymax {
            (ixmax - ixmin) * (iymax - iymin)
        } else {
            0
        }
    }

    /// Boundary-inclusive overlap test.
    ///
    /// Touching boxes intersect here even though their `intersection_area` is
    /// zero. Used only as a pre-filter, so it may report false positives but
    /// never false negatives.
    pub fn does_intersect(&self, other: &Box2D) -> bool {
        other.xmin <= self.xmax
            && self.xmin <= other.xmax
            && other.ymin <= self.ymax
            && self.ymin <= other.ymax
    }

    /// Returns `true` if the box stays at least `margin` pixels inside a
    /// `width x height` image, i.e. within `[margin, size - 1 - margin]` on both axes.
    pub fn within_margin(&self, width: usize, height: usize, margin: usize) -> bool {
        let m = margin as i64;
        let max_x = width as i64 - 1 - m;
        let max_y = height as i64 - 1 - m;
        self.xmin >= m && self.ymin >= m && self.xmax <= max_x && self.ymax <= max_y
    }
}
