//! Conversion profiles for common use cases.
//!
//! A profile picks the NRRD gzip level and the extraction batch size, so
//! users do not have to tune either directly.

use std::fmt;

use imzml_raster::pipeline::ConversionConfig;

/// Conversion profiles for common use cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Prioritize speed over output size.
    ///
    /// - NRRD gzip level 1
    /// - Batch size: 5,000 spectra
    Fast,

    /// Balance between speed and output size (default).
    ///
    /// - NRRD gzip level 6
    /// - Batch size: 1,000 spectra
    #[default]
    Balanced,

    /// Smallest NRRD files, slower conversion.
    ///
    /// - NRRD gzip level 9
    /// - Batch size: 500 spectra
    MaxCompression,
}

impl Profile {
    /// The library preset behind this profile
    pub fn conversion_config(&self) -> ConversionConfig {
        match self {
            Profile::Fast => ConversionConfig::fast_write(),
            Profile::Balanced => ConversionConfig::balanced(),
            Profile::MaxCompression => ConversionConfig::max_compression(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Fast => write!(f, "fast"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::MaxCompression => write!(f, "max-compression"),
        }
    }
}
