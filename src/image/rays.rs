//! Per-pixel ray distance grids.
//!
//! The backing buffer is row-major over pixels with all channels of a pixel
//! stored contiguously (`H x W x C`, the layout a network emits). A view
//! exposes a window of `len` consecutive channels starting at `offset`, which
//! lets one buffer hold several frames (`C = T * R`) or a combined prediction
//! whose first channel is the probability.

use crate::util::{StarPolyError, StarPolyResult};

/// Borrowed `W x H x C` view over interleaved ray distances.
#[derive(Copy, Clone, Debug)]
pub struct RayView<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
    channels: usize,
    offset: usize,
    len: usize,
}

impl<'a> RayView<'a> {
    /// Creates a view over all `channels` of each pixel.
    pub fn new(data: &'a [f32], width: usize, height: usize, channels: usize) -> StarPolyResult<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(StarPolyError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(channels))
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
            channels,
            offset: 0,
            len: channels,
        })
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of channels visible through this view.
    pub fn channels(&self) -> usize {
        self.len
    }

    /// Returns the visible channels of pixel `(x, y)`.
    pub fn rays(&self, x: usize, y: usize) -> Option<&'a [f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y * self.width + x) * self.channels + self.offset;
        self.data.get(start..start + self.len)
    }

    /// Narrows the view to channels `offset .. offset + len` of this view.
    pub fn window(&self, offset: usize, len: usize) -> StarPolyResult<Self> {
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if len == 0 || end > self.len {
            return Err(StarPolyError::IndexOutOfBounds {
                index: end,
                len: self.len,
                context: "channel",
            });
        }
        Ok(Self {
            offset: self.offset + offset,
            len,
            ..*self
        })
    }

    /// Number of `n_rays`-channel frames stacked along the channel axis.
    pub fn num_frames(&self, n_rays: usize) -> StarPolyResult<usize> {
        if n_rays < 3 {
            return Err(StarPolyError::TooFewRays { n_rays });
        }
        if self.len % n_rays != 0 {
            return Err(StarPolyError::ChannelsNotDivisible {
                channels: self.len,
                n_rays,
            });
        }
        Ok(self.len / n_rays)
    }

    /// Returns the ray window for frame `t` of a channel-stacked timelapse.
    pub fn frame(&self, t: usize, n_rays: usize) -> StarPolyResult<Self> {
        let frames = self.num_frames(n_rays)?;
        if t >= frames {
            return Err(StarPolyError::IndexOutOfBounds {
                index: t,
                len: frames,
                context: "frame",
            });
        }
        self.window(t * n_rays, n_rays)
    }
}

#[cfg(test)]
mod tests {
    use super::RayView;
    use crate::util::StarPolyError;

    #[test]
    fn rays_returns_pixel_channels() {
        let data: Vec<f32> = (0..2 * 2 * 3).map(|v| v as f32).collect();
        let view = RayView::new(&data, 2, 2, 3).unwrap();
        assert_eq!(view.rays(1, 0).unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(view.rays(0, 1).unwrap(), &[6.0, 7.0, 8.0]);
        assert!(view.rays(2, 0).is_none());
    }

    #[test]
    fn frames_split_channel_axis() {
        let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let view = RayView::new(&data, 1, 1, 6).unwrap();
        assert_eq!(view.num_frames(3).unwrap(), 2);
        assert_eq!(view.frame(1, 3).unwrap().rays(0, 0).unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(
            view.num_frames(4).err().unwrap(),
            StarPolyError::ChannelsNotDivisible {
                channels: 6,
                n_rays: 4
            }
        );
    }
}
