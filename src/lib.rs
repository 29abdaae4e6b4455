//! # HU-preview library
//!
//! Turns CT volumes into 8-bit RGB preview images.
//!
//! Volumes are read from one of three containers:
//!  - DICOM, a single file or a directory holding one series
//!  - NIfTI (`.nii`, `.nii.gz`)
//!  - MetaImage (`.mhd` with inline or external raw data)
//!
//! Stored values are converted to Hounsfield units while loading. A run of
//! slices centered on the middle of the volume is then extracted, normalized
//! for display (NIfTI planes are rotated, padded MetaImage scans are cropped
//! back to 512 pixels), windowed and quantized to 256 gray levels, and
//! replicated into RGB.
//!
//! The quantizer and the slice selector are plain functions over `ndarray`
//! arrays and can be used without any of the loaders.
//!
//! # Examples
//!
//! ## Rendering the three middle slices of a NIfTI volume
//!
//! ```no_run
//! # use hu_preview::{convert, ConvertOptions, SourceFormat};
//! let options = ConvertOptions::builder()
//!     .num_slices(3)
//!     .window(-600, 1500)
//!     .build();
//! let images = convert("chest.nii.gz", SourceFormat::Nifti, &options)
//!     .expect("should have converted the volume");
//! for (i, image) in images.iter().enumerate() {
//!     image.save(format!("slice_{i}.png")).expect("should have saved");
//! }
//! ```
//!
//! ## Quantizing a plane directly
//!
//! ```
//! # use hu_preview::{quantize, WindowSpec};
//! let plane = ndarray::array![[-1024i16, -437, 150]];
//! let raster = quantize(plane.view(), &WindowSpec::default()).unwrap();
//! assert_eq!(raster.get_pixel(1, 0).0, [127, 127, 127]);
//! ```

pub mod convert;
pub mod enums;
pub mod error;
pub mod logger;
pub mod metaimage;
pub mod quantizer;
pub mod volume;
pub mod volume_loader;
pub mod window;

pub use convert::{ConvertOptions, ConvertOptionsBuilder, convert, convert_volume};
pub use enums::{DegeneratePolicy, SliceAxis, SortBy, SourceFormat};
pub use error::{ConvertError, LoadError};
pub use quantizer::{Raster, quantize, quantize_dyn, quantize_with_policy};
pub use volume::{REFERENCE_SIZE, SliceLayout, Volume};
pub use volume_loader::{Rescale, VolumeLoader};
pub use window::{HU_MAX, HU_MIN, WindowBounds, WindowSpec};
