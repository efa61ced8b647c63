//! MetaImage (`.mhd` header + `.raw` data), the registration engine's
//! exchange format.
//!
//! Images are written as little-endian `MET_FLOAT`. Reading accepts the
//! scalar element types elastix and transformix may emit for 2-D results.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use ndarray::{Array2, ArrayView2};

use crate::error::{MocoError, Result};

/// Scalar element types understood by [`read_mhd`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementType {
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
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "MET_CHAR" => Self::Char,
            "MET_UCHAR" => Self::UChar,
            "MET_SHORT" => Self::Short,
            "MET_USHORT" => Self::UShort,
            "MET_INT" => Self::Int,
            "MET_UINT" => Self::UInt,
            "MET_FLOAT" => Self::Float,
            "MET_DOUBLE" => Self::Double,
            _ => return None,
        })
    }

    fn size(self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// Write `image` as `<stem>.mhd` + `<stem>.raw` next to `header_path`.
pub fn write_mhd<T>(image: ArrayView2<'_, T>, header_path: &Path) -> Result<()>
where
    T: Copy + Into<f64>,
{
    let (h, w) = image.dim();
    let raw_path = header_path.with_extension("raw");
    let raw_name = raw_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut raw = BufWriter::new(File::create(&raw_path)?);
    for &v in image.iter() {
        let v: f64 = v.into();
        raw.write_f32::<LittleEndian>(v as f32)?;
    }
    raw.flush()?;

    let header = format!(
        "ObjectType = Image\n\
         NDims = 2\n\
         BinaryData = True\n\
         BinaryDataByteOrderMSB = False\n\
         CompressedData = False\n\
         ElementSpacing = 1 1\n\
         DimSize = {w} {h}\n\
         ElementType = MET_FLOAT\n\
         ElementDataFile = {raw_name}\n"
    );
    fs::write(header_path, header)?;
    Ok(())
}

/// Read a 2-D MetaImage as f32, shape = (height, width).
///
/// A 3-D image whose last dimension is 1 is accepted as 2-D.
pub fn read_mhd(header_path: &Path) -> Result<Array2<f32>> {
    let invalid = |reason: String| MocoError::InvalidMhd {
        path: header_path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(header_path)?;
    let fields = parse_header(&text);

    if fields
        .get("CompressedData")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return Err(invalid("compressed data is not supported".into()));
    }

    let dims: Vec<usize> = fields
        .get("DimSize")
        .ok_or_else(|| invalid("missing DimSize".into()))?
        .split_whitespace()
        .map(|d| d.parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| invalid(format!("bad DimSize: {e}")))?;
    let (w, h) = match dims.as_slice() {
        [w, h] | [w, h, 1] => (*w, *h),
        other => return Err(invalid(format!("expected a 2-D image, got DimSize {other:?}"))),
    };

    let element = fields
        .get("ElementType")
        .and_then(|t| ElementType::parse(t))
        .ok_or_else(|| invalid(format!("unsupported ElementType {:?}", fields.get("ElementType"))))?;

    let msb = fields
        .get("BinaryDataByteOrderMSB")
        .or_else(|| fields.get("ByteOrderMSB"))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let data_file = fields
        .get("ElementDataFile")
        .ok_or_else(|| invalid("missing ElementDataFile".into()))?;
    if data_file.eq_ignore_ascii_case("LOCAL") {
        return Err(invalid("inline (LOCAL) data is not supported".into()));
    }
    let raw_path = resolve_data_file(header_path, data_file);

    let header_skip = match fields.get("HeaderSize") {
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| invalid(format!("unsupported HeaderSize {v}")))?,
        None => 0,
    };

    let file = File::open(&raw_path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let needed = w
        .checked_mul(h)
        .and_then(|n| n.checked_mul(element.size()))
        .and_then(|n| n.checked_add(header_skip))
        .ok_or_else(|| invalid(format!("DimSize {w} x {h} is too large")))?;
    if mmap.len() < needed {
        return Err(invalid(format!(
            "data file truncated: expected {needed} bytes, got {}",
            mmap.len()
        )));
    }
    let bytes = &mmap[header_skip..needed];

    let samples = if msb {
        decode::<BigEndian>(bytes, element)
    } else {
        decode::<LittleEndian>(bytes, element)
    };

    Array2::from_shape_vec((h, w), samples).map_err(|e| invalid(e.to_string()))
}

fn parse_header(text: &str) -> HashMap<&str, &str> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect()
}

fn resolve_data_file(header_path: &Path, data_file: &str) -> PathBuf {
    let p = Path::new(data_file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        header_path
            .parent()
            .map(|dir| dir.join(p))
            .unwrap_or_else(|| p.to_path_buf())
    }
}

fn decode<B: ByteOrder>(bytes: &[u8], element: ElementType) -> Vec<f32> {
    let chunks = bytes.chunks_exact(element.size());
    match element {
        ElementType::Char => chunks.map(|c| c[0] as i8 as f32).collect(),
        ElementType::UChar => chunks.map(|c| c[0] as f32).collect(),
        ElementType::Short => chunks.map(|c| B::read_i16(c) as f32).collect(),
        ElementType::UShort => chunks.map(|c| B::read_u16(c) as f32).collect(),
        ElementType::Int => chunks.map(|c| B::read_i32(c) as f32).collect(),
        ElementType::UInt => chunks.map(|c| B::read_u32(c) as f32).collect(),
        ElementType::Float => chunks.map(B::read_f32).collect(),
        ElementType::Double => chunks.map(|c| B::read_f64(c) as f32).collect(),
    }
}
