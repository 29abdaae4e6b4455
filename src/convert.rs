use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::enums::{DegeneratePolicy, SourceFormat};
use crate::error::Result;
use crate::quantizer::{Raster, quantize_with_policy};
use crate::volume::{SliceLayout, Volume};
use crate::volume_loader::VolumeLoader;
use crate::window::WindowSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub num_slices: usize,
    pub window: WindowSpec,
    pub degenerate: DegeneratePolicy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            num_slices: 1,
            window: WindowSpec::default(),
            degenerate: DegeneratePolicy::Reject,
        }
    }
}

impl ConvertOptions {
    pub fn builder() -> ConvertOptionsBuilder {
        ConvertOptionsBuilder::default()
    }
}

#[derive(Default)]
pub struct ConvertOptionsBuilder {
    num_slices: Option<usize>,
    window: Option<WindowSpec>,
    degenerate: Option<DegeneratePolicy>,
}

impl ConvertOptionsBuilder {
    pub fn num_slices(mut self, num_slices: usize) -> Self {
        self.num_slices = Some(num_slices);
        self
    }

    pub fn window(mut self, length: i32, width: i32) -> Self {
        self.window = Some(WindowSpec::new(length, width));
        self
    }

    pub fn degenerate(mut self, policy: DegeneratePolicy) -> Self {
        self.degenerate = Some(policy);
        self
    }

    pub fn build(self) -> ConvertOptions {
        let default = ConvertOptions::default();
        ConvertOptions {
            num_slices: self.num_slices.unwrap_or(default.num_slices),
            window: self.window.unwrap_or(default.window),
            degenerate: self.degenerate.unwrap_or(default.degenerate),
        }
    }
}

/// Decode `path` as `format` and render the selected slices.
///
/// Decoding failures come back as [`ConvertError::Load`](crate::error::ConvertError::Load).
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display(), format = ?format))]
pub fn convert(
    path: impl AsRef<Path>,
    format: SourceFormat,
    options: &ConvertOptions,
) -> Result<Vec<Raster>> {
    let start = Instant::now();
    let volume = VolumeLoader::load(path, format)?;
    debug!(
        "Decoded volume {:?} in {:.3}ms",
        volume.dim(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    convert_volume(&volume, &format.layout(), options)
}

/// Render slices of an already decoded volume.
pub fn convert_volume(
    volume: &Volume,
    layout: &SliceLayout,
    options: &ConvertOptions,
) -> Result<Vec<Raster>> {
    let bounds = options.window.bounds();
    let planes = volume.select_slices(options.num_slices, layout)?;
    let rasters = planes
        .iter()
        .map(|plane| quantize_with_policy(plane.view(), &options.window, options.degenerate))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Rendered {} slice(s) with window {}..{} HU",
        rasters.len(),
        bounds.min,
        bounds.max
    );
    Ok(rasters)
}
