//! Image file helpers built on the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{StarPolyError, StarPolyResult};
use std::path::Path;

fn io_err(err: image::ImageError) -> StarPolyError {
    StarPolyError::ImageIo {
        reason: err.to_string(),
    }
}

/// Converts a label image to 16-bit grayscale.
///
/// Fails with [`StarPolyError::LabelOverflow`] when an id exceeds `u16::MAX`.
pub fn labels_to_gray16(labels: ImageView<'_, u32>) -> StarPolyResult<image::ImageBuffer<image::Luma<u16>, Vec<u16>>> {
    let width = labels.width();
    let height = labels.height();
    let mut raw = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = labels.row(y).ok_or(StarPolyError::BufferTooSmall {
            needed: (y + 1) * labels.stride(),
            got: labels.as_slice().len(),
        })?;
        for &id in row {
            let id = u16::try_from(id).map_err(|_| StarPolyError::LabelOverflow {
                count: id as usize,
                max: u16::MAX as u64,
            })?;
            raw.push(id);
        }
    }
    image::ImageBuffer::from_raw(width as u32, height as u32, raw).ok_or(
        StarPolyError::InvalidDimensions { width, height },
    )
}

/// Saves a label image as 16-bit grayscale; the format follows the extension.
pub fn save_labels<P: AsRef<Path>>(labels: ImageView<'_, u32>, path: P) -> StarPolyResult<()> {
    labels_to_gray16(labels)?.save(path).map_err(io_err)
}

/// Converts a grayscale image into a probability map scaled to `[0, 1]`.
pub fn prob_from_dynamic_image(img: &image::DynamicImage) -> StarPolyResult<OwnedImage<f32>> {
    let gray = img.to_luma16();
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    let scale = 1.0 / u16::MAX as f32;
    let data = gray.as_raw().iter().map(|&v| v as f32 * scale).collect();
    OwnedImage::from_vec(data, width, height)
}

/// Loads a probability map from an 8- or 16-bit grayscale image file.
pub fn load_prob_image<P: AsRef<Path>>(path: P) -> StarPolyResult<OwnedImage<f32>> {
    let img = image::open(path).map_err(io_err)?;
    prob_from_dynamic_image(&img)
}
