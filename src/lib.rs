//! # imzml-raster - imzML to raster/array conversion
//!
//! `imzml-raster` reads a mass spectrometry imaging acquisition stored as an
//! imzML document plus its `.ibd` binary file and turns it into one 2D
//! intensity image per target m/z.
//!
//! ## Key Features
//!
//! - **Streaming imzML reader**: the XML document is parsed once with
//!   `quick-xml`; spectra are read lazily from the `.ibd` file by offset.
//!   Continuous and processed storage modes, all four numeric encodings and
//!   zlib-compressed arrays are supported.
//!
//! - **Single-pass extraction**: every pixel spectrum is read once and
//!   evaluated against all targets, filling one `[y][x][k]` buffer.
//!
//! - **Deterministic outputs**: gzip-compressed NRRD images, NumPy `.npy`
//!   arrays and a `.npz` metadata archive, byte-identical across re-runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imzml_raster::pipeline::{ConversionConfig, Converter};
//!
//! let config = ConversionConfig {
//!     centroids: Some(vec![760.585, 782.567]),
//!     tolerance_ppm: 10.0,
//!     save_nrrd: true,
//!     save_npy_spatial: true,
//!     ..Default::default()
//! };
//!
//! let report = Converter::with_config(config).convert("sample.imzML")?;
//! println!("{}", report);
//! # Ok::<(), imzml_raster::pipeline::ConversionError>(())
//! ```
//!
//! This writes, next to the input:
//! ```text
//! sample_mz_760.5850.nrrd
//! sample_mz_782.5670.nrrd
//! sample_data_spatial.npy      # [height, width, 2], <f4
//! sample_data_metadata.npz     # mz_values, tolerance_ppm, image size, source
//! ```
//!
//! ## In-memory sources
//!
//! Extraction only depends on the [`source::ImagingSource`] trait, so any
//! grid of spectra can be rasterized:
//!
//! ```rust
//! use imzml_raster::pipeline::{extract_stack, IntensityStrategy, Target, Tolerance};
//! use imzml_raster::source::{GridShape, MemorySource, PixelCoord, Spectrum, SpectrumType};
//!
//! let mut source = MemorySource::new("demo", GridShape::new(1, 2), SpectrumType::Centroid)
//!     .with_spectrum(PixelCoord::new(1, 1), Spectrum::new(vec![500.0], vec![3.0]))
//!     .with_spectrum(PixelCoord::new(2, 1), Spectrum::new(vec![500.01], vec![4.0]));
//!
//! let target = Target::new(500.0, Tolerance::from_ppm(75.0)?);
//! let stack = extract_stack(&mut source, &[target], IntensityStrategy::Sum, 100, 0)?;
//! assert_eq!(stack.data(), &[3.0, 4.0]);
//! # Ok::<(), imzml_raster::pipeline::ConversionError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`imzml`]: opens imzML/ibd pairs through `mzdata` and maps spectra to pixels
//! - [`source`]: the pixel-grid abstraction extraction runs against
//! - [`pipeline`]: target resolution, window extraction, stacking, output plan
//! - [`writer`]: NRRD, NPY and NPZ serializers

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod imzml;
pub mod pipeline;
pub mod source;
pub mod writer;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::imzml::{ImzMLError, ImzMLReader, StorageMode};
    pub use crate::pipeline::{
        ConversionConfig, ConversionError, ConversionReport, Converter, IntensityStrategy,
        StackedArray, Target, Tolerance,
    };
    pub use crate::source::{
        GridShape, ImagingSource, MemorySource, PixelCoord, Spectrum, SpectrumType,
    };
    pub use crate::writer::{WriterConfig, WriterError, WriterStats};
}
