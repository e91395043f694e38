//! NumPy `.npz` archives
//!
//! An `.npz` file is a ZIP archive whose entries are `.npy` files named after
//! the arrays they hold. Entries are stored uncompressed with a fixed
//! timestamp so identical inputs produce identical archives.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::npy::{write_npy_str_to, write_npy_to, NpyElement};
use super::{WriterError, WriterStats};

/// Builder for an `.npz` archive
pub struct NpzWriter {
    path: PathBuf,
    zip_writer: ZipWriter<BufWriter<File>>,
    entries: usize,
    elements: usize,
}

impl NpzWriter {
    /// Create the archive file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, WriterError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let zip_writer = ZipWriter::new(BufWriter::new(file));
        Ok(Self {
            path,
            zip_writer,
            entries: 0,
            elements: 0,
        })
    }

    fn entry_options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644)
    }

    fn start_entry(&mut self, name: &str) -> Result<(), WriterError> {
        if name.is_empty() || name.contains('/') {
            return Err(WriterError::InvalidData(format!(
                "invalid npz entry name '{name}'"
            )));
        }
        self.zip_writer
            .start_file(format!("{name}.npy"), Self::entry_options())?;
        self.entries += 1;
        Ok(())
    }

    /// Add an n-dimensional array
    pub fn add_array<T: NpyElement>(
        &mut self,
        name: &str,
        shape: &[usize],
        data: &[T],
    ) -> Result<(), WriterError> {
        self.start_entry(name)?;
        write_npy_to(&mut self.zip_writer, shape, data)?;
        self.elements += data.len();
        Ok(())
    }

    /// Add a 0-dimensional numeric array
    pub fn add_scalar<T: NpyElement>(&mut self, name: &str, value: T) -> Result<(), WriterError> {
        self.add_array(name, &[], &[value])
    }

    /// Add a 0-dimensional unicode string array
    pub fn add_str(&mut self, name: &str, value: &str) -> Result<(), WriterError> {
        self.start_entry(name)?;
        write_npy_str_to(&mut self.zip_writer, value)?;
        self.elements += 1;
        Ok(())
    }

    /// Finalize the archive
    pub fn finish(self) -> Result<WriterStats, WriterError> {
        let mut inner = self.zip_writer.finish()?;
        inner.flush()?;
        drop(inner);

        log::debug!("Wrote {} entries to {}", self.entries, self.path.display());
        Ok(WriterStats {
            file_size_bytes: std::fs::metadata(&self.path)?.len(),
            path: self.path,
            elements_written: self.elements,
        })
    }
}
