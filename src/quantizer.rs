//! Hounsfield windowing and 8-bit quantization.
//!
//! A plane of HU values is clipped into the window bounds, mapped linearly
//! onto `0..=255` with truncating division, and replicated into the three
//! channels of an RGB raster.

use image::{ImageBuffer, RgbImage};
use ndarray::{Array2, ArrayView2, ArrayViewD, Ix2, Zip};

use crate::enums::DegeneratePolicy;
use crate::error::{ConvertError, Result};
use crate::window::{WindowBounds, WindowSpec};

/// 8-bit RGB image with equal R, G and B in every pixel.
pub type Raster = RgbImage;

/// Quantize a plane, rejecting degenerate windows.
pub fn quantize<T>(plane: ArrayView2<'_, T>, window: &WindowSpec) -> Result<Raster>
where
    T: Copy + Into<f64> + Send + Sync,
{
    quantize_with_policy(plane, window, DegeneratePolicy::Reject)
}

pub fn quantize_with_policy<T>(
    plane: ArrayView2<'_, T>,
    window: &WindowSpec,
    policy: DegeneratePolicy,
) -> Result<Raster>
where
    T: Copy + Into<f64> + Send + Sync,
{
    let bounds = window.bounds();
    let gray = if bounds.is_degenerate() {
        let fill = match policy {
            DegeneratePolicy::Reject => {
                return Err(ConvertError::DegenerateWindow {
                    min: bounds.min,
                    max: bounds.max,
                });
            }
            DegeneratePolicy::Black => 0,
            DegeneratePolicy::White => u8::MAX,
        };
        Array2::from_elem(plane.dim(), fill)
    } else {
        Zip::from(plane).par_map_collect(|&value| quantize_value(value.into(), &bounds))
    };
    gray_to_rgb(gray.view())
}

/// Like [`quantize_with_policy`], for arrays whose dimensionality is only
/// known at runtime.
///
/// # Errors
///
/// [`ConvertError::InvalidShape`] unless `plane` is 2-D.
pub fn quantize_dyn<T>(
    plane: ArrayViewD<'_, T>,
    window: &WindowSpec,
    policy: DegeneratePolicy,
) -> Result<Raster>
where
    T: Copy + Into<f64> + Send + Sync,
{
    let shape = plane.shape().to_vec();
    let plane = plane
        .into_dimensionality::<Ix2>()
        .map_err(|_| ConvertError::InvalidShape {
            expected: 2,
            actual: shape,
        })?;
    quantize_with_policy(plane, window, policy)
}

// (v - min) is non-negative after clipping, so floor truncates. Integer
// inputs stay exact in f64 and the divisor never exceeds 2048, so this
// agrees with integer division.
#[inline]
pub(crate) fn quantize_value(value: f64, bounds: &WindowBounds) -> u8 {
    let min = f64::from(bounds.min);
    let clipped = value.clamp(min, f64::from(bounds.max));
    ((clipped - min) * 255.0 / bounds.span()).floor() as u8
}

fn gray_to_rgb(gray: ArrayView2<'_, u8>) -> Result<Raster> {
    let (height, width) = gray.dim();
    let shape_error = || ConvertError::InvalidShape {
        expected: 2,
        actual: vec![height, width],
    };
    let width_px = u32::try_from(width).map_err(|_| shape_error())?;
    let height_px = u32::try_from(height).map_err(|_| shape_error())?;

    let pixel_data: Vec<u8> = gray.iter().flat_map(|&g| [g, g, g]).collect();
    ImageBuffer::from_raw(width_px, height_px, pixel_data).ok_or_else(shape_error)
}
