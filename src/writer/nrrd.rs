//! NRRD ("Nearly Raw Raster Data") image writer
//!
//! Writes a 2D `float` image as a text header followed by a gzip payload.
//! The fastest axis is x, so a row-major `[y][x]` buffer is written as is.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::GzBuilder;

use super::{WriterConfig, WriterError, WriterStats};

/// A single-channel 2D image ready to be written
#[derive(Debug, Clone)]
pub struct NrrdImage<'a> {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Row-major values, `height * width` long
    pub data: &'a [f32],
    /// Sample spacing along x and y, in millimeters
    pub spacing: Option<(f64, f64)>,
    /// Free-form `key:=value` metadata
    pub key_values: BTreeMap<String, String>,
}

impl<'a> NrrdImage<'a> {
    /// An image over `data` with no spacing or metadata
    pub fn new(width: usize, height: usize, data: &'a [f32]) -> Self {
        Self {
            width,
            height,
            data,
            spacing: None,
            key_values: BTreeMap::new(),
        }
    }

    /// Set the spacing from a pixel size in micrometers
    pub fn with_pixel_size_um(mut self, pixel_size: Option<(f64, f64)>) -> Self {
        self.spacing = pixel_size.map(|(x, y)| (x / 1000.0, y / 1000.0));
        self
    }

    /// Add a `key:=value` line
    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_values.insert(key.into(), value.into());
        self
    }

    fn validate(&self) -> Result<(), WriterError> {
        if self.data.len() != self.width * self.height {
            return Err(WriterError::InvalidData(format!(
                "image buffer holds {} values, expected {}x{}",
                self.data.len(),
                self.width,
                self.height
            )));
        }
        for key in self.key_values.keys() {
            if key.is_empty() || key.contains(":=") || key.contains('\n') {
                return Err(WriterError::InvalidData(format!(
                    "invalid NRRD key '{key}'"
                )));
            }
        }
        Ok(())
    }

    /// Text header, terminated by the blank line that precedes the payload
    pub fn header(&self) -> String {
        let (sx, sy) = self.spacing.unwrap_or((1.0, 1.0));
        let mut header = String::new();
        header.push_str("NRRD0004\n");
        header.push_str("# Complete NRRD file format specification at:\n");
        header.push_str("# http://teem.sourceforge.net/nrrd/format.html\n");
        header.push_str("type: float\n");
        header.push_str("dimension: 2\n");
        header.push_str("space dimension: 2\n");
        header.push_str(&format!("sizes: {} {}\n", self.width, self.height));
        header.push_str(&format!("space directions: ({sx},0) (0,{sy})\n"));
        header.push_str("kinds: domain domain\n");
        header.push_str("endian: little\n");
        header.push_str("encoding: gzip\n");
        header.push_str("space origin: (0,0)\n");
        for (key, value) in &self.key_values {
            header.push_str(&format!("{}:={}\n", key, value.replace('\n', " ")));
        }
        header.push('\n');
        header
    }
}

/// Write an image to an `.nrrd` file
pub fn write_nrrd(
    path: &Path,
    image: &NrrdImage<'_>,
    config: &WriterConfig,
) -> Result<WriterStats, WriterError> {
    image.validate()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(image.header().as_bytes())?;

    // mtime 0 keeps the gzip member byte-identical across runs
    let mut encoder = GzBuilder::new().mtime(0).write(writer, config.compression());
    for &value in image.data {
        encoder.write_f32::<LittleEndian>(value)?;
    }
    let mut writer = encoder.finish()?;
    writer.flush()?;
    drop(writer);

    Ok(WriterStats {
        path: path.to_path_buf(),
        elements_written: image.data.len(),
        file_size_bytes: std::fs::metadata(path)?.len(),
    })
}
