use crate::{
    enums::{SortBy, SourceFormat},
    error::LoadError,
    metaimage,
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use rayon::prelude::*;
use std::{fs, path::Path};
use tracing::{debug, info, instrument, warn};

/// Linear calibration from stored DICOM values to Hounsfield units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rescale {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl Rescale {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Read _Rescale Slope_ and _Rescale Intercept_, falling back to the
    /// identity for whichever is absent.
    pub fn from_dicom(dicom_object: &FileDicomObject<InMemDicomObject>) -> Self {
        let read = |tag| {
            dicom_object
                .element(tag)
                .ok()
                .and_then(|element| element.to_float64().ok())
        };
        let default = Self::default();
        Self {
            slope: read(tags::RESCALE_SLOPE).unwrap_or(default.slope),
            intercept: read(tags::RESCALE_INTERCEPT).unwrap_or(default.intercept),
        }
    }

    /// `hu = slope * raw + intercept`
    pub fn apply(&self, raw: Array2<f32>) -> Array2<f32> {
        raw.mapv_into(|v| (self.slope * f64::from(v) + self.intercept) as f32)
    }
}

pub struct VolumeLoader;

/// Why a DICOM object was left out of a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Skipped {
    MissingSortKey,
    Undecodable,
}

impl VolumeLoader {
    /// Decode `path` according to `format`.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display(), format = ?format))]
    pub fn load(path: impl AsRef<Path>, format: SourceFormat) -> Result<Volume, LoadError> {
        let path = path.as_ref();
        info!("Loading {:?} as {:?}", path, format);
        match format {
            SourceFormat::Dicom => Self::load_dicom_file(path),
            SourceFormat::DicomSeries => Self::load_dicom_series(path, SortBy::default()),
            SourceFormat::Nifti => Self::load_nifti(path),
            SourceFormat::MetaImage => Self::load_metaimage(path),
        }
    }

    /// Load a single DICOM image as a volume of depth 1, in HU.
    ///
    /// Only the first frame of multi-frame objects is used.
    pub fn load_dicom_file(path: impl AsRef<Path>) -> Result<Volume, LoadError> {
        let dicom_object = open_file(path.as_ref())?;
        let image = Self::decode_image(&dicom_object)?;
        Ok(Volume::from_plane(image))
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, LoadError> {
        let extracted: Vec<_> = dicom_objects
            .par_iter()
            .map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        let skipped = |reason: Skipped| extracted.iter().filter(|e| e.as_ref().err() == Some(&reason)).count();
        let (unsorted, undecodable) = (skipped(Skipped::MissingSortKey), skipped(Skipped::Undecodable));
        if unsorted > 0 {
            warn!(
                "Skipped {} of {} DICOM objects without a {:?} sort key",
                unsorted,
                dicom_objects.len(),
                sort_by
            );
        }
        if undecodable > 0 {
            warn!(
                "Skipped {} of {} DICOM objects without decodable pixel data",
                undecodable,
                dicom_objects.len()
            );
        }

        let mut images_with_order: Vec<_> = extracted.into_iter().filter_map(Result::ok).collect();
        if images_with_order.is_empty() {
            return Err(LoadError::NoValidImages);
        }

        Self::sort_images(&mut images_with_order, sort_by);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        Ok(Volume::new(Self::build_volume_array(&images)))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        sort_by: SortBy,
    ) -> Result<Volume, LoadError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_dicom_series(path: impl AsRef<Path>, sort_by: SortBy) -> Result<Volume, LoadError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(LoadError::NoValidImages);
        }
        debug!("Found {} DICOM files in {:?}", paths.len(), path.as_ref());

        Self::load_from_file_paths(&paths, sort_by)
    }

    /// Load a `.nii` or `.nii.gz` volume as `(x, y, z)`.
    ///
    /// The `scl_slope`/`scl_inter` calibration is applied by the reader.
    pub fn load_nifti(path: impl AsRef<Path>) -> Result<Volume, LoadError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = obj.header();
        debug!(
            "NIfTI dim {:?}, scl_slope {}, scl_inter {}",
            header.dim, header.scl_slope, header.scl_inter
        );

        let array = obj.into_volume().into_ndarray::<f32>()?;
        let shape = array.shape().to_vec();
        let values: Vec<f32> = array.iter().copied().collect();
        Ok(Volume::new(Self::xyz_array(&shape, values)?))
    }

    /// Load a MetaImage volume as `(z, y, x)`.
    pub fn load_metaimage(path: impl AsRef<Path>) -> Result<Volume, LoadError> {
        Ok(Volume::new(metaimage::read_metaimage(path)?))
    }

    // Row-major values over `shape`. 2-D images gain a unit z axis, 4-D and
    // up keep the first time point.
    fn xyz_array(shape: &[usize], values: Vec<f32>) -> Result<Array3<f32>, LoadError> {
        let (dim, values) = match *shape {
            [x, y] => ((x, y, 1), values),
            [x, y, z] => ((x, y, z), values),
            [x, y, z, ..] => {
                let trailing = shape[3..].iter().product::<usize>().max(1);
                let first: Vec<f32> = values.into_iter().step_by(trailing).collect();
                ((x, y, z), first)
            }
            _ => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "{}-D NIfTI volume",
                    shape.len()
                )));
            }
        };
        Array3::from_shape_vec(dim, values)
            .map_err(|e| LoadError::UnsupportedFormat(format!("NIfTI shape {shape:?}: {e}")))
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Result<(Option<f32>, Array2<f32>), Skipped> {
        let order = Self::get_sort_order(dicom_object, sort_by).ok_or(Skipped::MissingSortKey)?;
        let image_2d = Self::decode_image(dicom_object)
            .inspect_err(|e| debug!("Could not decode DICOM image: {}", e))
            .map_err(|_| Skipped::Undecodable)?;
        Ok((order, image_2d))
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<f32>, LoadError> {
        let pixel_data = dicom_object
            .decode_pixel_data()
            .map_err(|e| LoadError::PixelData(e.to_string()))?;
        // raw stored values; the rescale is applied below so it is the only
        // transform between the file and the quantizer
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        let raw = pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .map_err(|e| LoadError::PixelData(e.to_string()))?
            .slice_move(s![0, .., .., 0]);

        let rescale = Rescale::from_dicom(dicom_object);
        debug!("Rescale {:?} on {:?} image", rescale, raw.dim());
        Ok(rescale.apply(raw))
    }

    fn sort_images(images_with_order: &mut [(Option<f32>, Array2<f32>)], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    fn validate_dimensions(images: &[Array2<f32>]) -> Result<(), LoadError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(LoadError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<f32>]) -> Array3<f32> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }
}
