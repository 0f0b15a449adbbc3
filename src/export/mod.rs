//! Export of accepted polygons as label images or polygon records.
//!
//! Winners arrive in acceptance order (descending score). Ids are 1-based in
//! that order. Labels are painted in reverse, so on overlapping pixels the
//! higher-scored polygon is painted last and stays visible.

use crate::candidate::Candidate;
use crate::geometry::{Box2D, StarPolygon};
use crate::image::OwnedImage;
use crate::trace::trace_span;
use crate::util::{StarPolyError, StarPolyResult};

/// Integer label image; 0 is background.
pub type LabelImage = OwnedImage<u32>;

/// One accepted polygon in vector form.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonRecord {
    /// 1-based id, matching the label value of the same object.
    pub id: u32,
    /// Frame index when produced from a timelapse stack.
    pub frame: Option<usize>,
    /// Probability at the origin pixel.
    pub score: f32,
    /// Origin pixel `[x, y]`.
    pub origin: [usize; 2],
    /// Polygon vertices `[x, y]` in angular order.
    pub vertices: Vec<[f64; 2]>,
}

fn label_id(index: usize) -> StarPolyResult<u32> {
    u32::try_from(index + 1).map_err(|_| StarPolyError::LabelOverflow {
        count: index + 1,
        max: u32::MAX as u64,
    })
}

/// Emits winners as ordered polygon records.
pub fn polygon_records(winners: &[Candidate], frame: Option<usize>) -> StarPolyResult<Vec<PolygonRecord>> {
    winners
        .iter()
        .enumerate()
        .map(|(index, c)| {
            Ok(PolygonRecord {
                id: label_id(index)?,
                frame,
                score: c.score,
                origin: [c.x, c.y],
                vertices: c.polygon.vertices().to_vec(),
            })
        })
        .collect()
}

/// Rasterizes winners into a `width x height` label image.
pub fn render_labels(winners: &[Candidate], width: usize, height: usize) -> StarPolyResult<LabelImage> {
    let _span = trace_span!("render_labels", winners = winners.len()).entered();
    if winners.len() > u32::MAX as usize {
        return Err(StarPolyError::LabelOverflow {
            count: winners.len(),
            max: u32::MAX as u64,
        });
    }
    let mut labels = LabelImage::zeros(width, height)?;
    for (index, c) in winners.iter().enumerate().rev() {
        paint_polygon(&mut labels, &c.polygon, &c.bbox, label_id(index)?);
    }
    Ok(labels)
}

/// Sets every pixel whose center lies inside or on `polygon` to `id`.
pub fn paint_polygon(labels: &mut LabelImage, polygon: &StarPolygon, bbox: &Box2D, id: u32) {
    let width = labels.width() as i64;
    let height = labels.height() as i64;
    let x0 = bbox.xmin().max(0);
    let x1 = bbox.xmax().min(width - 1);
    let y0 = bbox.ymin().max(0);
    let y1 = bbox.ymax().min(height - 1);
    if x0 > x1 || y0 > y1 {
        return;
    }
    let stride = labels.width();
    let data = labels.data_mut();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if polygon.contains([x as f64, y as f64]) {
                data[y as usize * stride + x as usize] = id;
            }
        }
    }
}

/// Per-frame label images of a timelapse, appended in frame order.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelStack {
    width: usize,
    height: usize,
    frames: Vec<LabelImage>,
}

impl LabelStack {
    /// Creates an empty stack for `width x height` frames.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
        }
    }

    /// Appends the next frame; its extent must match the stack.
    pub fn push(&mut self, labels: LabelImage) -> StarPolyResult<()> {
        if labels.width() != self.width || labels.height() != self.height {
            return Err(StarPolyError::InvalidDimensions {
                width: labels.width(),
                height: labels.height(),
            });
        }
        self.frames.push(labels);
        Ok(())
    }

    /// Frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of frames pushed so far.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns frame `t`.
    pub fn frame(&self, t: usize) -> Option<&LabelImage> {
        self.frames.get(t)
    }

    /// Returns all frames in order.
    pub fn frames(&self) -> &[LabelImage] {
        &self.frames
    }

    /// Flattens the stack into one frame-major buffer.
    pub fn to_vec(&self) -> StarPolyResult<Vec<u32>> {
        let total = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(self.frames.len()))
            .ok_or(StarPolyError::CapacityExceeded {
                requested: usize::MAX,
            })?;
        let mut out = Vec::new();
        out.try_reserve_exact(total)
            .map_err(|_| StarPolyError::CapacityExceeded { requested: total })?;
        for frame in &self.frames {
            out.extend_from_slice(frame.data());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{polygon_records, render_labels, LabelImage, LabelStack};
    use crate::candidate::Candidate;
    use crate::geometry::{RayTable, StarPolygon};

    fn candidate(x: usize, y: usize, score: f32, radius: f32) -> Candidate {
        let table = RayTable::new(16).unwrap();
        let polygon = StarPolygon::from_rays([x as f64, y as f64], &[radius; 16], &table).unwrap();
        let bbox = polygon.bbox().unwrap();
        Candidate {
            x,
            y,
            score,
            polygon,
            bbox,
        }
    }

    #[test]
    fn higher_score_wins_overlapping_pixels() {
        let winners = vec![candidate(10, 10, 0.9, 3.0), candidate(13, 10, 0.6, 3.0)];
        let labels = render_labels(&winners, 24, 20).unwrap();
        let at = |x: usize, y: usize| labels.data()[y * 24 + x];
        assert_eq!(at(10, 10), 1);
        assert_eq!(at(12, 10), 1);
        assert_eq!(at(15, 10), 2);
        assert_eq!(at(0, 0), 0);
    }

    #[test]
    fn zero_radius_paints_single_pixel() {
        let labels = render_labels(&[candidate(4, 6, 0.9, 0.0)], 10, 10).unwrap();
        let painted: Vec<_> = labels
            .data()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(painted, vec![6 * 10 + 4]);
    }

    #[test]
    fn polygons_outside_the_image_are_clipped() {
        let labels = render_labels(&[candidate(0, 0, 0.9, 3.0)], 5, 5).unwrap();
        assert_eq!(labels.data()[0], 1);
        assert_eq!(labels.data()[4 * 5 + 4], 0);
    }

    #[test]
    fn records_follow_acceptance_order() {
        let winners = vec![candidate(10, 10, 0.9, 2.0), candidate(30, 5, 0.7, 2.0)];
        let records = polygon_records(&winners, Some(3)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].origin, [30, 5]);
        assert_eq!(records[1].frame, Some(3));
        assert_eq!(records[0].vertices.len(), 16);
    }

    #[test]
    fn stack_rejects_mismatched_frames() {
        let mut stack = LabelStack::new(4, 4);
        stack.push(LabelImage::zeros(4, 4).unwrap()).unwrap();
        assert!(stack.push(LabelImage::zeros(4, 3).unwrap()).is_err());
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.to_vec().unwrap().len(), 16);
    }
}
