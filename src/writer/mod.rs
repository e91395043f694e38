//! # Output Writer Module
//!
//! Serializers for the raster and array outputs of a conversion:
//!
//! - **NRRD**: one gzip-compressed 2D `float` image per target m/z
//! - **NPY**: little-endian C-ordered arrays (`<f4` stacks)
//! - **NPZ**: a stored ZIP archive of `.npy` entries for run metadata
//!
//! All writers are deterministic: identical inputs give byte-identical files.

mod config;
mod error;
mod npy;
mod npz;
mod nrrd;
mod stats;

pub use config::{WriterConfig, DEFAULT_GZIP_LEVEL};
pub use error::WriterError;
pub use npy::{write_npy, write_npy_header, write_npy_str_to, write_npy_to, NpyElement};
pub use npz::NpzWriter;
pub use nrrd::{write_nrrd, NrrdImage};
pub use stats::WriterStats;
