//! NumPy `.npy` serialization (format version 1.0)
//!
//! Layout: `\x93NUMPY`, version bytes `1 0`, a little-endian `u16` header
//! length, then a Python dict literal padded with spaces and a trailing
//! newline so the data starts on a 64-byte boundary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{WriterError, WriterStats};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_PREAMBLE_LEN: usize = NPY_MAGIC.len() + 2 + 2;
const NPY_ALIGNMENT: usize = 64;

/// Element types that can be stored in an `.npy` array
pub trait NpyElement: Copy {
    /// NumPy dtype descriptor, e.g. `<f4`
    fn descr() -> &'static str;

    /// Write one value in little-endian order
    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()>;
}

impl NpyElement for f32 {
    fn descr() -> &'static str {
        "<f4"
    }

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_f32::<LittleEndian>(self)
    }
}

impl NpyElement for f64 {
    fn descr() -> &'static str {
        "<f8"
    }

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_f64::<LittleEndian>(self)
    }
}

impl NpyElement for i64 {
    fn descr() -> &'static str {
        "<i8"
    }

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i64::<LittleEndian>(self)
    }
}

/// Python tuple literal for a shape: `()`, `(n,)` or `(a, b, ...)`
fn shape_literal(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    match dims.len() {
        0 => "()".to_string(),
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    }
}

/// Write the magic, version and padded header dict
pub fn write_npy_header<W: Write>(
    writer: &mut W,
    descr: &str,
    shape: &[usize],
) -> Result<(), WriterError> {
    let header_dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr,
        shape_literal(shape)
    );

    // Preamble + dict + newline must land on the alignment boundary
    let unpadded = NPY_PREAMBLE_LEN + header_dict.len() + 1;
    let pad = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    let header = format!("{}{}\n", header_dict, " ".repeat(pad));

    let header_len = u16::try_from(header.len()).map_err(|_| {
        WriterError::InvalidData(format!(
            "npy header of {} bytes exceeds the version 1.0 limit",
            header.len()
        ))
    })?;

    writer.write_all(NPY_MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(header.as_bytes())?;
    Ok(())
}

/// Write a C-ordered array with the given shape to any writer
pub fn write_npy_to<W: Write, T: NpyElement>(
    writer: &mut W,
    shape: &[usize],
    data: &[T],
) -> Result<(), WriterError> {
    let expected_len: usize = shape.iter().product();
    if data.len() != expected_len {
        return Err(WriterError::InvalidData(format!(
            "Data length mismatch: got {}, expected {} for shape {:?}",
            data.len(),
            expected_len,
            shape
        )));
    }

    write_npy_header(writer, T::descr(), shape)?;
    for &value in data {
        value.write_le(writer)?;
    }
    Ok(())
}

/// Write a fixed-width unicode scalar (`<U{n}`, UTF-32LE code points)
pub fn write_npy_str_to<W: Write>(writer: &mut W, value: &str) -> Result<(), WriterError> {
    let chars: Vec<char> = value.chars().collect();
    // numpy has no zero-width unicode dtype
    let width = chars.len().max(1);

    write_npy_header(writer, &format!("<U{width}"), &[])?;
    for c in &chars {
        writer.write_u32::<LittleEndian>(*c as u32)?;
    }
    if chars.is_empty() {
        writer.write_u32::<LittleEndian>(0)?;
    }
    Ok(())
}

/// Write an array to an `.npy` file
pub fn write_npy<T: NpyElement>(
    path: &Path,
    shape: &[usize],
    data: &[T],
) -> Result<WriterStats, WriterError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);
    write_npy_to(&mut writer, shape, data)?;
    writer.flush()?;
    drop(writer);

    Ok(WriterStats {
        path: path.to_path_buf(),
        elements_written: data.len(),
        file_size_bytes: std::fs::metadata(path)?.len(),
    })
}
