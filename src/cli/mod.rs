use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use imzml_raster::pipeline::IntensityStrategy;

mod config;
mod convert;
mod profile;

pub use profile::Profile;

/// imzML to NRRD/NumPy converter
///
/// Extracts one intensity image per target m/z from an imzML/ibd pair.
#[derive(Parser, Debug)]
#[command(name = "imzml-to-nrrd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input imzML file path (the .ibd file must sit next to it)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Target m/z values (default: the centroid list of a centroid-mode file)
    #[arg(long, value_name = "MZ", num_args = 1..)]
    pub centroids: Option<Vec<f64>>,

    /// Output directory (default: the input's directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Tolerance window in ppm [default: 75]
    #[arg(long, value_name = "PPM")]
    pub tolerance: Option<f64>,

    /// Write one NRRD image per target m/z
    #[arg(long)]
    pub save_nrrd: bool,

    /// Write the [height, width, n_targets] array
    #[arg(long)]
    pub save_npy_spatial: bool,

    /// Write the [height*width, n_targets] array
    #[arg(long)]
    pub save_npy_list: bool,

    /// Base name for array outputs (default: <input_stem>_data)
    #[arg(long, value_name = "NAME")]
    pub npy_output: Option<String>,

    /// How samples inside the tolerance window become one intensity [default: sum]
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Conversion profile (fast, balanced, max-compression)
    #[arg(short = 'p', long, default_value = "balanced", value_enum)]
    pub profile: ProfileArg,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write a JSON summary of the run
    #[arg(long)]
    pub json_summary: bool,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Conversion profile for optimizing speed vs output size.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Prioritize speed over output size
    Fast,
    /// Balance between speed and output size
    #[default]
    Balanced,
    /// Smallest NRRD files, slower conversion
    MaxCompression,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fast => Profile::Fast,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::MaxCompression => Profile::MaxCompression,
        }
    }
}

/// Window strategy.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    /// Sum of all intensities in the window
    Sum,
    /// Largest intensity in the window
    Max,
    /// Intensity of the sample closest to the target
    Nearest,
}

impl From<StrategyArg> for IntensityStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sum => IntensityStrategy::Sum,
            StrategyArg::Max => IntensityStrategy::Max,
            StrategyArg::Nearest => IntensityStrategy::Nearest,
        }
    }
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    convert::run(cli)
}
