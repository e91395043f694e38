//! # imzML to NRRD converter
//!
//! A command-line tool that turns an imzML/ibd imaging acquisition into one
//! intensity image per target m/z.
//!
//! ## Outputs
//!
//! - **NRRD**: one gzip-compressed 2D image per target (`--save-nrrd`)
//! - **NumPy**: `[height, width, n_targets]` and `[height*width, n_targets]`
//!   arrays plus a metadata `.npz` (`--save-npy-spatial`, `--save-npy-list`)
//!
//! ## Usage
//!
//! ```bash
//! # Centroid-mode file: one image per embedded centroid
//! imzml-to-nrrd sample.imzML --save-nrrd
//!
//! # Explicit targets, 10 ppm window, NumPy outputs in another directory
//! imzml-to-nrrd sample.imzML --centroids 760.585 782.567 --tolerance 10 \
//!     --save-npy-spatial --output-dir out/
//! ```

use std::process::ExitCode;

use clap::Parser;

use imzml_raster::pipeline::ConversionError;

mod cli;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());

    match cli::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err
                .downcast_ref::<ConversionError>()
                .map_or(1, ConversionError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}
