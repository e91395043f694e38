use anyhow::{Context, Result};
use log::info;

use imzml_raster::pipeline::{ConversionConfig, ConversionError, Converter};

use super::config::Config;
use super::{Cli, Profile};

/// Convert one imzML file to the requested NRRD/NumPy outputs
pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    info!("imzML converter - imzML to NRRD/NumPy");
    info!("=====================================");
    info!("Input: {}", cli.input.display());
    if let Some(dir) = &config.output_dir {
        info!("Output directory: {}", dir.display());
    }
    info!("Profile: {}", Profile::from(cli.profile));
    info!("Strategy: {}", config.strategy);
    info!("NRRD gzip level: {}", config.writer_config.gzip_level);
    info!("Batch size: {}", config.batch_size);

    let converter = Converter::with_config(config);
    let report = converter
        .convert(&cli.input)
        .with_context(|| format!("Conversion of {} failed", cli.input.display()))?;

    info!("Conversion complete!");
    for line in report.to_string().lines() {
        info!("  {}", line);
    }

    Ok(())
}

/// Merge CLI flags, the optional config file and the profile preset.
///
/// Precedence: CLI flag > config file > profile > built-in default.
fn build_config(cli: &Cli) -> Result<ConversionConfig, ConversionError> {
    let file = match &cli.config {
        Some(path) => Config::from_file(path)
            .map_err(|err| ConversionError::InvalidArgument(format!("{err:#}")))?,
        None => Config::default(),
    };
    let section = file.conversion;

    let mut config = Profile::from(cli.profile).conversion_config();

    if let Some(level) = file.output.nrrd_compression_level {
        if level > 9 {
            return Err(ConversionError::InvalidArgument(format!(
                "nrrd_compression_level must be 0-9, got {level}"
            )));
        }
        config.writer_config = config.writer_config.with_gzip_level(level);
    }
    if let Some(batch_size) = section.batch_size {
        config.batch_size = batch_size;
    }

    config.centroids = cli.centroids.clone();
    config.output_dir = cli.output_dir.clone();
    if let Some(tolerance) = cli.tolerance.or(section.tolerance) {
        config.tolerance_ppm = tolerance;
    }
    if let Some(strategy) = cli.strategy.map(Into::into).or(section.strategy) {
        config.strategy = strategy;
    }
    config.save_nrrd = cli.save_nrrd || section.save_nrrd.unwrap_or(false);
    config.save_npy_spatial = cli.save_npy_spatial || section.save_npy_spatial.unwrap_or(false);
    config.save_npy_list = cli.save_npy_list || section.save_npy_list.unwrap_or(false);
    config.json_summary = cli.json_summary || section.json_summary.unwrap_or(false);
    config.npy_output = cli.npy_output.clone().or(section.npy_output);

    config.validate()?;
    Ok(config)
}
