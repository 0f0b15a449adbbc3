//! Timelapse stacks and combined network predictions.

use crate::image::rays::RayView;
use crate::image::{required_len, ImageView, OwnedImage};
use crate::util::{StarPolyError, StarPolyResult};

/// Borrowed frame-major stack of `frames` contiguous `width x height` planes.
#[derive(Copy, Clone, Debug)]
pub struct StackView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    frames: usize,
}

impl<'a, T> StackView<'a, T> {
    /// Creates a stack view; `data` must hold at least `width * height * frames` elements.
    pub fn new(data: &'a [T], width: usize, height: usize, frames: usize) -> StarPolyResult<Self> {
        let plane = required_len(width, height, width)?;
        if frames == 0 {
            return Err(StarPolyError::InvalidInput("stack must contain at least one frame"));
        }
        let needed = plane
            .checked_mul(frames)
            .ok_or(StarPolyError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(StarPolyError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            frames,
        })
    }

    /// Wraps a single image as a one-frame stack.
    pub fn single(view: ImageView<'a, T>) -> StarPolyResult<Self> {
        if view.stride() != view.width() {
            return Err(StarPolyError::InvalidStride {
                width: view.width(),
                stride: view.stride(),
            });
        }
        Self::new(view.as_slice(), view.width(), view.height(), 1)
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns frame `t` as a 2D view.
    pub fn frame(&self, t: usize) -> StarPolyResult<ImageView<'a, T>> {
        if t >= self.frames {
            return Err(StarPolyError::IndexOutOfBounds {
                index: t,
                len: self.frames,
                context: "frame",
            });
        }
        let plane = self.width * self.height;
        ImageView::from_slice(&self.data[t * plane..(t + 1) * plane], self.width, self.height)
    }
}

/// Network output split into a probability map and ray distances.
///
/// The combined buffer is `H x W x (1 + R)` with the probability in channel 0.
/// The probability plane is copied out; distances stay borrowed.
pub struct Prediction<'a> {
    prob: OwnedImage<f32>,
    dist: RayView<'a>,
}

impl<'a> Prediction<'a> {
    /// Splits an interleaved prediction with `channels = 1 + R` per pixel.
    pub fn split(data: &'a [f32], width: usize, height: usize, channels: usize) -> StarPolyResult<Self> {
        if channels < 4 {
            return Err(StarPolyError::TooFewRays {
                n_rays: channels.saturating_sub(1),
            });
        }
        let all = RayView::new(data, width, height, channels)?;
        let mut prob = OwnedImage::zeros(width, height)?;
        let out = prob.data_mut();
        for y in 0..height {
            for x in 0..width {
                if let Some(px) = all.rays(x, y) {
                    out[y * width + x] = px[0];
                }
            }
        }
        let dist = all.window(1, channels - 1)?;
        Ok(Self { prob, dist })
    }

    /// Returns the probability map.
    pub fn prob(&self) -> ImageView<'_, f32> {
        self.prob.view()
    }

    /// Returns the ray distances (channels `1..`).
    pub fn dist(&self) -> RayView<'a> {
        self.dist
    }

    /// Number of rays per pixel.
    pub fn n_rays(&self) -> usize {
        self.dist.channels()
    }
}

#[cfg(test)]
mod tests {
    use super::{Prediction, StackView};
    use crate::util::StarPolyError;

    #[test]
    fn split_separates_probability_channel() {
        // 2x1 image, 1 + 3 channels.
        let data = [0.9, 1.0, 2.0, 3.0, 0.1, 4.0, 5.0, 6.0];
        let pred = Prediction::split(&data, 2, 1, 4).unwrap();
        assert_eq!(pred.n_rays(), 3);
        assert_eq!(pred.prob().row(0).unwrap(), &[0.9, 0.1]);
        assert_eq!(pred.dist().rays(1, 0).unwrap(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn split_rejects_too_few_channels() {
        let data = [0.0f32; 6];
        let err = Prediction::split(&data, 2, 1, 3).err().unwrap();
        assert_eq!(err, StarPolyError::TooFewRays { n_rays: 2 });
    }

    #[test]
    fn stack_frames_are_contiguous_planes() {
        let data: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let stack = StackView::new(&data, 2, 2, 2).unwrap();
        assert_eq!(stack.frame(1).unwrap().row(0).unwrap(), &[4.0, 5.0]);
        assert!(stack.frame(2).is_err());
    }
}
