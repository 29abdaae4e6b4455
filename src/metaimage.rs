//! Minimal MetaImage (`.mhd`) reader.
//!
//! Handles single-channel 2-D and 3-D images stored either inline after the
//! header (`ElementDataFile = LOCAL`) or in a separate raw file, optionally
//! zlib-compressed. Arrays come out as `(z, y, x)`.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use ndarray::Array3;
use tracing::debug;

use crate::error::LoadError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ElementType {
    fn parse(value: &str) -> Result<Self, LoadError> {
        Ok(match value {
            "MET_CHAR" => ElementType::Char,
            "MET_UCHAR" => ElementType::UChar,
            "MET_SHORT" => ElementType::Short,
            "MET_USHORT" => ElementType::UShort,
            "MET_INT" | "MET_LONG" => ElementType::Int,
            "MET_UINT" | "MET_ULONG" => ElementType::UInt,
            "MET_FLOAT" => ElementType::Float,
            "MET_DOUBLE" => ElementType::Double,
            other => return Err(meta_error(format!("unsupported ElementType {other}"))),
        })
    }

    pub fn size(&self) -> usize {
        match self {
            ElementType::Char | ElementType::UChar => 1,
            ElementType::Short | ElementType::UShort => 2,
            ElementType::Int | ElementType::UInt | ElementType::Float => 4,
            ElementType::Double => 8,
        }
    }

    /// Decode raw elements into `f32`, honouring the byte order.
    pub fn decode(&self, bytes: &[u8], msb: bool) -> Vec<f32> {
        macro_rules! decode_as {
            ($ty:ty) => {
                bytes
                    .chunks_exact(std::mem::size_of::<$ty>())
                    .map(|chunk| {
                        let mut buf = [0u8; std::mem::size_of::<$ty>()];
                        buf.copy_from_slice(chunk);
                        let value = if msb {
                            <$ty>::from_be_bytes(buf)
                        } else {
                            <$ty>::from_le_bytes(buf)
                        };
                        value as f32
                    })
                    .collect()
            };
        }

        match self {
            ElementType::Char => decode_as!(i8),
            ElementType::UChar => decode_as!(u8),
            ElementType::Short => decode_as!(i16),
            ElementType::UShort => decode_as!(u16),
            ElementType::Int => decode_as!(i32),
            ElementType::UInt => decode_as!(u32),
            ElementType::Float => decode_as!(f32),
            ElementType::Double => decode_as!(f64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataFile {
    Local,
    External(PathBuf),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetaImageHeader {
    /// `DimSize`, fastest-varying axis first.
    pub dim_size: Vec<usize>,
    pub element_type: ElementType,
    pub data_file: DataFile,
    pub msb: bool,
    pub compressed: bool,
    /// Bytes to skip in an external data file; `None` for `-1`, which places
    /// the data at the end of the file.
    pub header_size: Option<u64>,
}

impl MetaImageHeader {
    /// Parse `key = value` lines up to and including `ElementDataFile`.
    ///
    /// Returns the header and the byte offset right after it, where LOCAL
    /// data begins.
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), LoadError> {
        let mut n_dims = None;
        let mut dim_size = None;
        let mut element_type = None;
        let mut msb = false;
        let mut compressed = false;
        let mut header_size = Some(0);
        let mut channels = 1;

        let mut offset = 0;
        while offset < bytes.len() {
            let line_end = bytes[offset..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| offset + p + 1);
            let line = String::from_utf8_lossy(&bytes[offset..line_end]);
            offset = line_end;

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key.to_ascii_lowercase().as_str() {
                "ndims" => n_dims = Some(parse_number::<usize>(key, value)?),
                "dimsize" => {
                    dim_size = Some(
                        value
                            .split_whitespace()
                            .map(|v| parse_number::<usize>(key, v))
                            .collect::<Result<Vec<_>, _>>()?,
                    )
                }
                "elementtype" => element_type = Some(ElementType::parse(value)?),
                "elementnumberofchannels" => channels = parse_number::<usize>(key, value)?,
                "binarydatabyteordermsb" | "elementbyteordermsb" | "byteordermsb" => {
                    msb = parse_bool(value)
                }
                "compresseddata" => compressed = parse_bool(value),
                "headersize" => {
                    let size = parse_number::<i64>(key, value)?;
                    header_size = u64::try_from(size).ok();
                }
                "elementdatafile" => {
                    let data_file = match value {
                        "LOCAL" | "Local" | "local" => DataFile::Local,
                        "LIST" => return Err(meta_error("LIST data files are not supported")),
                        file if file.contains('%') => {
                            return Err(meta_error("patterned data files are not supported"));
                        }
                        file => DataFile::External(PathBuf::from(file)),
                    };

                    let dim_size = dim_size.ok_or_else(|| meta_error("missing DimSize"))?;
                    if let Some(n) = n_dims {
                        if n != dim_size.len() {
                            return Err(meta_error(format!(
                                "NDims = {n} but DimSize has {} entries",
                                dim_size.len()
                            )));
                        }
                    }
                    if channels != 1 {
                        return Err(meta_error(format!(
                            "{channels}-channel images are not supported"
                        )));
                    }

                    let header = Self {
                        dim_size,
                        element_type: element_type
                            .ok_or_else(|| meta_error("missing ElementType"))?,
                        data_file,
                        msb,
                        compressed,
                        header_size,
                    };
                    return Ok((header, offset));
                }
                _ => {}
            }
        }

        Err(meta_error("missing ElementDataFile"))
    }

    /// Array shape `(z, y, x)`; 2-D images get a depth of 1.
    pub fn shape(&self) -> Result<(usize, usize, usize), LoadError> {
        match self.dim_size[..] {
            [x, y] => Ok((1, y, x)),
            [x, y, z] => Ok((z, y, x)),
            _ => Err(meta_error(format!(
                "{}-D images are not supported",
                self.dim_size.len()
            ))),
        }
    }

    /// Bytes of pixel data the header declares.
    pub fn data_len(&self) -> Result<usize, LoadError> {
        self.dim_size
            .iter()
            .try_fold(self.element_type.size(), |len, &dim| len.checked_mul(dim))
            .ok_or_else(|| meta_error("DimSize overflows"))
    }
}

/// Read a `.mhd` file and its pixel data as a `(z, y, x)` array.
pub fn read_metaimage(path: impl AsRef<Path>) -> Result<Array3<f32>, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let (header, data_offset) = MetaImageHeader::parse(&bytes)?;
    let shape = header.shape()?;
    debug!("MetaImage header {:?}, shape {:?}", header, shape);

    let raw = match &header.data_file {
        DataFile::Local => bytes[data_offset..].to_vec(),
        DataFile::External(file) => {
            let data_path = path.parent().unwrap_or(Path::new(".")).join(file);
            fs::read(&data_path)?
        }
    };

    let expected = header.data_len()?;
    let data = if header.compressed {
        // never inflate past what the header declares
        let mut inflated = Vec::new();
        ZlibDecoder::new(&raw[..])
            .take(expected as u64)
            .read_to_end(&mut inflated)?;
        inflated
    } else {
        match (&header.data_file, header.header_size) {
            (DataFile::Local, _) => raw,
            (DataFile::External(_), Some(skip)) => {
                raw.get(skip as usize..).map(<[u8]>::to_vec).unwrap_or_default()
            }
            (DataFile::External(_), None) => {
                raw[raw.len().saturating_sub(expected)..].to_vec()
            }
        }
    };

    if data.len() < expected {
        return Err(meta_error(format!(
            "expected {expected} bytes of pixel data, found {}",
            data.len()
        )));
    }

    let values = header.element_type.decode(&data[..expected], header.msb);
    Array3::from_shape_vec(shape, values).map_err(|e| meta_error(e.to_string()))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, LoadError> {
    value
        .parse()
        .map_err(|_| meta_error(format!("invalid {key} value {value:?}")))
}

fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn meta_error(message: impl Into<String>) -> LoadError {
    LoadError::MetaImage(message.into())
}
