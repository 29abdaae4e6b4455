use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::{Compression, write::ZlibEncoder};
use hu_preview::{ConvertError, ConvertOptions, LoadError, SourceFormat, VolumeLoader, convert};

const DEPTH: usize = 5;
const ROWS: usize = 520;
const COLS: usize = 516;

// Slice z holds -1024 + 200 * z HU in the 512x512 center and -3000 in the
// padding around it.
fn scan_values() -> Vec<i16> {
    let (pad_r, pad_c) = ((ROWS - 512) / 2, (COLS - 512) / 2);
    let mut values = Vec::with_capacity(DEPTH * ROWS * COLS);
    for z in 0..DEPTH {
        for r in 0..ROWS {
            for c in 0..COLS {
                let inside = (pad_r..ROWS - pad_r).contains(&r) && (pad_c..COLS - pad_c).contains(&c);
                values.push(if inside { -1024 + 200 * z as i16 } else { -3000 });
            }
        }
    }
    values
}

fn encode(values: &[i16], msb: bool) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| if msb { v.to_be_bytes() } else { v.to_le_bytes() })
        .collect()
}

fn header(data_file: &str, msb: bool, compressed: bool) -> String {
    format!(
        "ObjectType = Image\n\
         NDims = 3\n\
         BinaryData = True\n\
         BinaryDataByteOrderMSB = {}\n\
         CompressedData = {}\n\
         ElementSpacing = 0.7 0.7 1.25\n\
         DimSize = {COLS} {ROWS} {DEPTH}\n\
         ElementType = MET_SHORT\n\
         ElementDataFile = {data_file}\n",
        if msb { "True" } else { "False" },
        if compressed { "True" } else { "False" },
    )
}

fn assert_middle_slices(path: &Path) {
    let options = ConvertOptions::builder().num_slices(3).build();
    let rasters = convert(path, SourceFormat::MetaImage, &options).unwrap();

    assert_eq!(rasters.len(), 3);
    // slices 1, 2, 3: (200, 400, 600) * 255 / 1174
    for (raster, expected) in rasters.iter().zip([43u8, 86, 130]) {
        assert_eq!(raster.dimensions(), (512, 512));
        assert!(raster.as_raw().iter().all(|&v| v == expected));
    }
}

#[test]
fn external_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scan.raw"), encode(&scan_values(), false)).unwrap();
    let mhd = dir.path().join("scan.mhd");
    fs::write(&mhd, header("scan.raw", false, false)).unwrap();

    assert_middle_slices(&mhd);
}

#[test]
fn local_big_endian_data() {
    let dir = tempfile::tempdir().unwrap();
    let mhd = dir.path().join("scan.mhd");
    let mut bytes = header("LOCAL", true, false).into_bytes();
    bytes.extend(encode(&scan_values(), true));
    fs::write(&mhd, bytes).unwrap();

    assert_middle_slices(&mhd);
}

#[test]
fn zlib_compressed_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&encode(&scan_values(), false)).unwrap();
    fs::write(dir.path().join("scan.zraw"), encoder.finish().unwrap()).unwrap();
    let mhd = dir.path().join("scan.mhd");
    fs::write(&mhd, header("scan.zraw", false, true)).unwrap();

    assert_middle_slices(&mhd);
}

#[test]
fn loader_keeps_padding_until_slicing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scan.raw"), encode(&scan_values(), false)).unwrap();
    let mhd = dir.path().join("scan.mhd");
    fs::write(&mhd, header("scan.raw", false, false)).unwrap();

    let volume = VolumeLoader::load_metaimage(&mhd).unwrap();
    assert_eq!(volume.dim(), (DEPTH, ROWS, COLS));
    assert_eq!(volume.data()[[0, 0, 0]], -3000.0);
    assert_eq!(volume.data()[[4, 10, 10]], -224.0);
}

#[test]
fn truncated_data_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scan.raw"), vec![0u8; 100]).unwrap();
    let mhd = dir.path().join("scan.mhd");
    fs::write(&mhd, header("scan.raw", false, false)).unwrap();

    let err = convert(&mhd, SourceFormat::MetaImage, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Load(LoadError::MetaImage(_))));
}

#[test]
fn too_many_slices_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("scan.raw"), encode(&scan_values(), false)).unwrap();
    let mhd = dir.path().join("scan.mhd");
    fs::write(&mhd, header("scan.raw", false, false)).unwrap();

    let options = ConvertOptions::builder().num_slices(DEPTH + 1).build();
    let err = convert(&mhd, SourceFormat::MetaImage, &options).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::SliceRange { start: -1, count: 6, depth: 5 }
    ));
}
