use std::ops::Range;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Slice, s};
use tracing::debug;

use crate::enums::SliceAxis;
use crate::error::{ConvertError, Result};

/// In-plane size that padded scans are cropped back to.
pub const REFERENCE_SIZE: usize = 512;

/// How planes are taken out of a volume and normalized for display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceLayout {
    /// Axis indexing the slices.
    pub axis: SliceAxis,
    /// Rotate every plane 90 degrees counter-clockwise.
    pub rotate: bool,
    /// Trim symmetric padding from both in-plane axes down to this size,
    /// before any plane is extracted.
    pub crop_to: Option<usize>,
}

/// A decoded volume of HU values.
#[derive(Clone, Debug, Default)]
pub struct Volume {
    pub data: Array3<f32>,
}

impl Volume {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Wrap a single image as a volume of depth 1 along the first axis.
    pub fn from_plane(plane: Array2<f32>) -> Self {
        Self {
            data: plane.insert_axis(Axis(0)),
        }
    }

    /// Get the dimensions of the underlying array, in storage order
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Number of slices along `axis`.
    pub fn depth(&self, axis: SliceAxis) -> usize {
        self.data.len_of(Axis(axis.index()))
    }

    pub fn get_slice_from_axis(&self, index: usize, axis: SliceAxis) -> Option<ArrayView2<'_, f32>> {
        if index >= self.depth(axis) {
            return None;
        }
        let slice_result = match axis {
            SliceAxis::First => self.data.slice(s![index, .., ..]),
            SliceAxis::Last => self.data.slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    /// Extract `num_slices` consecutive planes centered on the middle slice.
    ///
    /// The run starts at `depth / 2 - num_slices / 2`. Runs that do not fit
    /// inside the volume are rejected rather than clamped.
    ///
    /// # Errors
    ///
    /// [`ConvertError::SliceRange`] if `num_slices` is zero or the run
    /// leaves `0..depth`.
    pub fn select_slices(&self, num_slices: usize, layout: &SliceLayout) -> Result<Vec<Array2<f32>>> {
        let axis = Axis(layout.axis.index());
        let view = match layout.crop_to {
            Some(reference) => crop_padding(self.data.view(), layout.axis, reference),
            None => self.data.view(),
        };

        let range = centered_range(view.len_of(axis), num_slices)?;
        debug!(
            "Selecting slices {:?} of {} along {:?} (cropped shape {:?})",
            range,
            view.len_of(axis),
            layout.axis,
            view.dim()
        );

        Ok(range
            .map(|index| {
                let plane = view.index_axis(axis, index);
                if layout.rotate {
                    rotate90(plane)
                } else {
                    plane.to_owned()
                }
            })
            .collect())
    }
}

/// Indices `start..start + num_slices` with `start = depth / 2 - num_slices / 2`.
pub fn centered_range(depth: usize, num_slices: usize) -> Result<Range<usize>> {
    let start = (depth / 2) as isize - (num_slices / 2) as isize;
    let out_of_range = || ConvertError::SliceRange {
        start,
        count: num_slices,
        depth,
    };

    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    if num_slices == 0 || start + num_slices > depth {
        return Err(out_of_range());
    }
    Ok(start..start + num_slices)
}

/// Drop `max(dim - reference, 0) / 2` elements from both ends of each
/// in-plane axis.
fn crop_padding<'a>(
    mut view: ArrayView3<'a, f32>,
    slice_axis: SliceAxis,
    reference: usize,
) -> ArrayView3<'a, f32> {
    for k in (0..3).filter(|&k| k != slice_axis.index()) {
        let dim = view.len_of(Axis(k));
        let padding = dim.saturating_sub(reference) / 2;
        view.slice_axis_inplace(Axis(k), Slice::from(padding..dim - padding));
    }
    view
}

// Same as numpy's rot90: out[i, j] = plane[j, w - 1 - i]
fn rotate90(plane: ArrayView2<'_, f32>) -> Array2<f32> {
    plane
        .t()
        .slice(s![..;-1, ..])
        .as_standard_layout()
        .into_owned()
}
