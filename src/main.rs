use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use tracing::info;

use hu_preview::{
    convert::{ConvertOptions, convert},
    enums::{DegeneratePolicy, SourceFormat},
    logger,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Auto,
    Dicom,
    DicomSeries,
    Nifti,
    Mhd,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DegenerateArg {
    Reject,
    Black,
    White,
}

/// Render Hounsfield-windowed PNG previews of DICOM, NIfTI and MetaImage volumes.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Input file, or a directory of .dcm files.
    input: PathBuf,

    /// Input format; `auto` picks one from the path.
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Number of slices around the middle of the volume.
    #[arg(long, default_value_t = 1)]
    slices: usize,

    /// Window center in HU.
    #[arg(long, default_value_t = -600, allow_hyphen_values = true)]
    window_length: i32,

    /// Window width in HU.
    #[arg(long, default_value_t = 1500, allow_hyphen_values = true)]
    window_width: i32,

    /// Output for windows that collapse to a single value.
    #[arg(long, value_enum, default_value_t = DegenerateArg::Reject)]
    degenerate: DegenerateArg,

    /// Directory the PNG files are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    let format = match args.format {
        FormatArg::Auto => SourceFormat::from_path(&args.input)
            .ok_or_else(|| anyhow!("cannot tell the format of {}", args.input.display()))?,
        FormatArg::Dicom => SourceFormat::Dicom,
        FormatArg::DicomSeries => SourceFormat::DicomSeries,
        FormatArg::Nifti => SourceFormat::Nifti,
        FormatArg::Mhd => SourceFormat::MetaImage,
    };
    let degenerate = match args.degenerate {
        DegenerateArg::Reject => DegeneratePolicy::Reject,
        DegenerateArg::Black => DegeneratePolicy::Black,
        DegenerateArg::White => DegeneratePolicy::White,
    };

    let options = ConvertOptions::builder()
        .num_slices(args.slices)
        .window(args.window_length, args.window_width)
        .degenerate(degenerate)
        .build();

    let rasters = convert(&args.input, format, &options)
        .with_context(|| format!("failed to convert {}", args.input.display()))?;

    let stem = output_stem(&args.input);
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    for (i, raster) in rasters.iter().enumerate() {
        let path = args.out_dir.join(format!("{stem}_{i}.png"));
        raster
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }

    Ok(())
}

// "scan.nii.gz" -> "scan"; "volume" when nothing precedes the first dot
fn output_stem(input: &std::path::Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "volume".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn output_stem_strips_every_extension() {
        assert_eq!(output_stem(Path::new("data/scan.nii.gz")), "scan");
        assert_eq!(output_stem(Path::new("lung.mhd")), "lung");
        assert_eq!(output_stem(Path::new("series")), "series");
    }

    #[test]
    fn output_stem_falls_back_for_dotfiles() {
        assert_eq!(output_stem(Path::new("in/.scan.mhd")), "volume");
        assert_eq!(output_stem(Path::new("/")), "volume");
    }
}
