//! TOML configuration file support for power users.
//!
//! Instead of passing many CLI flags, users can specify settings in a config file:
//!
//! ```toml
//! # imzml-raster.toml
//! [conversion]
//! tolerance = 50.0
//! strategy = "max"
//! save_nrrd = true
//! save_npy_spatial = true
//! npy_output = "features.npy"
//! batch_size = 2000
//!
//! [output]
//! nrrd_compression_level = 9
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use imzml_raster::pipeline::IntensityStrategy;

/// Root configuration structure for imzml-raster.toml files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Conversion-specific settings.
    #[serde(default)]
    pub conversion: ConversionSection,

    /// Output writer settings.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[conversion]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionSection {
    /// Tolerance in ppm.
    pub tolerance: Option<f64>,

    /// Window strategy (sum, max, nearest).
    pub strategy: Option<IntensityStrategy>,

    pub save_nrrd: Option<bool>,
    pub save_npy_spatial: Option<bool>,
    pub save_npy_list: Option<bool>,

    /// Base name for array outputs.
    pub npy_output: Option<String>,

    /// Number of spectra to process per batch.
    pub batch_size: Option<usize>,

    pub json_summary: Option<bool>,
}

/// `[output]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// gzip level (0-9) for NRRD payloads.
    pub nrrd_compression_level: Option<u32>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}
