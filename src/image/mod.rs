//! Dense 2D grids consumed and produced by the engine.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride
//! (elements between row starts). Probability maps are `ImageView<f32>`, label
//! images are `OwnedImage<u32>`. Ray distances have their own interleaved
//! layout, see [`rays::RayView`].

use crate::util::{StarPolyError, StarPolyResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod rays;
pub mod stack;

/// Borrowed 2D view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> StarPolyResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> StarPolyResult<Self> {
        let needed = required_len(width, height, stride)?;
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
            stride,
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

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

pub(crate) fn required_len(width: usize, height: usize, stride: usize) -> StarPolyResult<usize> {
    if width == 0 || height == 0 {
        return Err(StarPolyError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(StarPolyError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(StarPolyError::InvalidDimensions { width, height })
}

/// Owned contiguous 2D buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Copy + Default> OwnedImage<T> {
    /// Allocates a `width x height` image filled with `T::default()`.
    ///
    /// Allocation failure is reported as [`StarPolyError::CapacityExceeded`].
    pub fn zeros(width: usize, height: usize) -> StarPolyResult<Self> {
        let needed = required_len(width, height, width)?;
        let mut data = Vec::new();
        data.try_reserve_exact(needed)
            .map_err(|_| StarPolyError::CapacityExceeded { requested: needed })?;
        data.resize(needed, T::default());
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies a strided view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, T>) -> StarPolyResult<Self> {
        let mut out = Self::zeros(view.width(), view.height())?;
        for y in 0..view.height() {
            let row = view.row(y).ok_or(StarPolyError::BufferTooSmall {
                needed: (y + 1) * view.stride(),
                got: view.as_slice().len(),
            })?;
            let start = y * out.width;
            out.data[start..start + out.width].copy_from_slice(row);
        }
        Ok(out)
    }
}

impl<T> OwnedImage<T> {
    /// Wraps a row-major buffer of exactly `width * height` elements.
    pub fn from_vec(data: Vec<T>, width: usize, height: usize) -> StarPolyResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() < needed {
            return Err(StarPolyError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(StarPolyError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Consumes the image and returns its pixel buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}
