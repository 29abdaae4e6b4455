use std::path::Path;

use crate::volume::SliceLayout;

/// Container format a volume was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// A single DICOM file.
    Dicom,
    /// A directory of DICOM files forming one series.
    DicomSeries,
    /// `.nii` or `.nii.gz`.
    Nifti,
    /// `.mhd` header with LOCAL or external raw data.
    MetaImage,
}

impl SourceFormat {
    /// Guess the format from a path: directories are DICOM series, files go
    /// by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Some(SourceFormat::DicomSeries);
        }
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Some(SourceFormat::Nifti)
        } else if name.ends_with(".mhd") {
            Some(SourceFormat::MetaImage)
        } else if name.ends_with(".dcm") {
            Some(SourceFormat::Dicom)
        } else {
            None
        }
    }

    /// Slice axis and display normalization used for this format.
    pub fn layout(&self) -> SliceLayout {
        match self {
            // (slice, row, col)
            SourceFormat::Dicom | SourceFormat::DicomSeries => SliceLayout {
                axis: SliceAxis::First,
                rotate: false,
                crop_to: None,
            },
            // (x, y, z): planes come out transposed, rot90 brings them upright
            SourceFormat::Nifti => SliceLayout {
                axis: SliceAxis::Last,
                rotate: true,
                crop_to: None,
            },
            // (z, y, x), padded scans are trimmed back to 512 in-plane
            SourceFormat::MetaImage => SliceLayout {
                axis: SliceAxis::First,
                rotate: false,
                crop_to: Some(crate::volume::REFERENCE_SIZE),
            },
        }
    }
}

/// Axis of a 3-D array that indexes slices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SliceAxis {
    #[default]
    First,
    Last,
}

impl SliceAxis {
    pub(crate) fn index(&self) -> usize {
        match self {
            SliceAxis::First => 0,
            SliceAxis::Last => 2,
        }
    }
}

/// What to produce when a window collapses to a single HU value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Fail with [`ConvertError::DegenerateWindow`](crate::error::ConvertError::DegenerateWindow).
    #[default]
    Reject,
    /// Every pixel becomes 0.
    Black,
    /// Every pixel becomes 255.
    White,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
