//! imzML to raster/array conversion pipeline
//!
//! Resolves the target m/z list, extracts one intensity channel per target
//! from every pixel spectrum, stacks the channels and hands them to the
//! NRRD/NPY/NPZ writers.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::imzml::ImzMLError;
use crate::source::SpectrumType;
use crate::writer::{WriterConfig, WriterError};

pub use assemble::{IntensityGrid, StackedArray};
pub use extract::{evaluate_spectrum, extract_grid, extract_stack, window_intensity, IntensityStrategy};
pub use outputs::OutputPlan;
pub use targets::{resolve_targets, ResolvedTargets, Target, TargetOrigin, Tolerance};

/// Default ppm tolerance
pub const DEFAULT_TOLERANCE_PPM: f64 = 75.0;

/// Errors that can occur during conversion
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Malformed argument or configuration value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Input file (or its .ibd companion) does not exist
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Centroid auto-detection requested on a non-centroid source
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source has no pixels
    #[error("Empty acquisition: {0}")]
    EmptyAcquisition(String),

    /// The auto-detected centroid list is empty
    #[error("No targets: {0}")]
    NoTargets(String),

    /// Error writing an output file
    #[error("Write error: {0}")]
    Write(#[from] WriterError),

    /// Error reading the imzML input
    #[error("imzML error: {0}")]
    Source(#[from] ImzMLError),
}

impl ConversionError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ConversionError::InvalidArgument(_) => 2,
            ConversionError::FileNotFound(_) => 3,
            ConversionError::UnsupportedFormat(_) | ConversionError::NoTargets(_) => 4,
            ConversionError::EmptyAcquisition(_) => 5,
            ConversionError::Write(_) => 6,
            ConversionError::Source(_) => 1,
        }
    }
}

/// Configuration for an imzML conversion
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Explicit target m/z values; `None` uses the embedded centroid list
    pub centroids: Option<Vec<f64>>,

    /// Tolerance window in ppm
    pub tolerance_ppm: f64,

    /// How samples inside the window become one intensity
    pub strategy: IntensityStrategy,

    /// Output directory (default: the input's directory)
    pub output_dir: Option<PathBuf>,

    /// Write one NRRD image per target
    pub save_nrrd: bool,

    /// Write the `[height, width, n_targets]` array
    pub save_npy_spatial: bool,

    /// Write the `[height*width, n_targets]` array
    pub save_npy_list: bool,

    /// Base name for array outputs (default: `<input_stem>_data`)
    pub npy_output: Option<String>,

    /// Write a JSON summary next to the array outputs
    pub json_summary: bool,

    /// Writer configuration
    pub writer_config: WriterConfig,

    /// Spectra read per extraction batch
    pub batch_size: usize,

    /// Progress log interval (pixels)
    pub progress_interval: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            centroids: None,
            tolerance_ppm: DEFAULT_TOLERANCE_PPM,
            strategy: IntensityStrategy::default(),
            output_dir: None,
            save_nrrd: false,
            save_npy_spatial: false,
            save_npy_list: false,
            npy_output: None,
            json_summary: false,
            writer_config: WriterConfig::default(),
            batch_size: 1000,
            progress_interval: 10_000,
        }
    }
}

impl ConversionConfig {
    /// Smallest NRRD files (slower gzip)
    pub fn max_compression() -> Self {
        Self {
            writer_config: WriterConfig::max_compression(),
            batch_size: 500,
            ..Self::default()
        }
    }

    /// Fastest conversion (larger NRRD files, bigger batches)
    pub fn fast_write() -> Self {
        Self {
            writer_config: WriterConfig::fast(),
            batch_size: 5000,
            ..Self::default()
        }
    }

    /// Balanced configuration (default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Whether any array output is requested
    pub fn writes_arrays(&self) -> bool {
        self.save_npy_spatial || self.save_npy_list
    }

    /// Whether any output at all is requested
    pub fn writes_anything(&self) -> bool {
        self.save_nrrd || self.writes_arrays() || self.json_summary
    }

    /// Reject values no conversion can run with
    pub fn validate(&self) -> Result<(), ConversionError> {
        Tolerance::from_ppm(self.tolerance_ppm)?;
        if self.batch_size == 0 {
            return Err(ConversionError::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }
        if let Some(name) = &self.npy_output {
            if name.trim().is_empty() {
                return Err(ConversionError::InvalidArgument(
                    "--npy-output must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Summary of a completed conversion
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Input file name
    pub source_file: String,
    /// Acquisition type of the input
    pub spectrum_type: SpectrumType,
    /// Where the target list came from
    pub target_origin: TargetOrigin,
    /// Target m/z values, in channel order
    pub mz_values: Vec<f64>,
    /// Tolerance in ppm
    pub tolerance_ppm: f64,
    /// Window strategy
    pub strategy: IntensityStrategy,
    /// Grid width
    pub image_width: usize,
    /// Grid height
    pub image_height: usize,
    /// Spectra read from the input
    pub pixels_read: usize,
    /// Files written, in write order
    pub outputs: Vec<PathBuf>,
    /// Total bytes written
    pub bytes_written: u64,
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source: {} ({})", self.source_file, self.spectrum_type)?;
        writeln!(
            f,
            "Grid: {} x {} ({} spectra)",
            self.image_width, self.image_height, self.pixels_read
        )?;
        writeln!(
            f,
            "Targets: {} ({}), tolerance {} ppm, {} strategy",
            self.mz_values.len(),
            self.target_origin,
            self.tolerance_ppm,
            self.strategy
        )?;
        write!(
            f,
            "Outputs: {} files, {:.2} MB",
            self.outputs.len(),
            self.bytes_written as f64 / (1024.0 * 1024.0)
        )
    }
}

/// Converter from imzML to NRRD/NPY/NPZ outputs
pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    /// Create a new converter with default configuration
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// Create a new converter with custom configuration
    pub fn with_config(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Set the ppm tolerance
    pub fn with_tolerance(mut self, tolerance_ppm: f64) -> Self {
        self.config.tolerance_ppm = tolerance_ppm;
        self
    }

    /// Set the window strategy
    pub fn with_strategy(mut self, strategy: IntensityStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

mod assemble;
mod convert;
mod extract;
mod outputs;
mod targets;
