use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("DICOM pixel data error: {0}")]
    PixelData(String),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("MetaImage error: {0}")]
    MetaImage(String),
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Expected a {expected}-D array, got shape {actual:?}")]
    InvalidShape {
        expected: usize,
        actual: Vec<usize>,
    },

    #[error("{count} slices starting at {start} fall outside a volume of depth {depth}")]
    SliceRange {
        start: isize,
        count: usize,
        depth: usize,
    },

    #[error("Window collapses to a single value ({min}..{max})")]
    DegenerateWindow { min: i32, max: i32 },

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
