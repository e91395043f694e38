use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use super::assemble::StackedArray;
use super::extract::extract_stack;
use super::outputs::OutputPlan;
use super::targets::{resolve_targets, ResolvedTargets, Tolerance};
use super::{ConversionError, ConversionReport, Converter};
use crate::imzml::{find_ibd_path, ImzMLReader};
use crate::source::ImagingSource;
use crate::writer::{write_npy, write_nrrd, NpzWriter, NrrdImage, WriterError, WriterStats};

impl Converter {
    /// Convert an imzML file (with its `.ibd` companion) to the requested outputs
    pub fn convert<P: AsRef<Path>>(
        &self,
        input_path: P,
    ) -> Result<ConversionReport, ConversionError> {
        let input_path = input_path.as_ref();
        self.config.validate()?;

        if !input_path.is_file() {
            return Err(ConversionError::FileNotFound(input_path.to_path_buf()));
        }
        let is_imzml = input_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("imzml"));
        if !is_imzml {
            warn!(
                "Input file {} does not have an .imzML extension",
                input_path.display()
            );
        }
        if find_ibd_path(input_path).is_none() {
            return Err(ConversionError::FileNotFound(input_path.with_extension("ibd")));
        }

        info!("Loading imzML file: {}", input_path.display());
        let mut reader = ImzMLReader::open(input_path)?;
        info!("Spectrum type: {}", reader.spectrum_type());

        self.convert_source(&mut reader, input_path)
    }

    /// Run the conversion against an already opened source.
    ///
    /// `input_path` only drives output naming and placement.
    pub fn convert_source<S: ImagingSource + ?Sized>(
        &self,
        source: &mut S,
        input_path: &Path,
    ) -> Result<ConversionReport, ConversionError> {
        let start = Instant::now();
        self.config.validate()?;
        let tolerance = Tolerance::from_ppm(self.config.tolerance_ppm)?;

        if !self.config.writes_anything() {
            warn!(
                "No output requested (--save-nrrd, --save-npy-spatial, --save-npy-list); \
                 extracting without writing"
            );
        }

        let resolved = resolve_targets(source, self.config.centroids.as_deref(), tolerance)?;
        info!("Tolerance: {} ppm", tolerance.ppm());
        info!("Processing {} peaks...", resolved.len());

        let stack = extract_stack(
            source,
            &resolved.targets,
            self.config.strategy,
            self.config.batch_size,
            self.config.progress_interval,
        )?;

        let shape = stack.grid_shape();
        let mut report = ConversionReport {
            source_file: source.source_name().to_string(),
            spectrum_type: source.spectrum_type(),
            target_origin: resolved.origin,
            mz_values: resolved.mz_values(),
            tolerance_ppm: tolerance.ppm(),
            strategy: self.config.strategy,
            image_width: shape.width,
            image_height: shape.height,
            pixels_read: source.pixel_count(),
            ..Default::default()
        };

        let plan = OutputPlan::new(
            input_path,
            self.config.output_dir.as_deref(),
            self.config.npy_output.as_deref(),
        );
        self.write_outputs(source, &plan, &resolved, &stack, &mut report)?;

        info!(
            "Conversion complete in {:.2}s: {} files written",
            start.elapsed().as_secs_f64(),
            report.outputs.len()
        );
        Ok(report)
    }

    fn write_outputs<S: ImagingSource + ?Sized>(
        &self,
        source: &S,
        plan: &OutputPlan,
        resolved: &ResolvedTargets,
        stack: &StackedArray,
        report: &mut ConversionReport,
    ) -> Result<(), ConversionError> {
        let shape = stack.grid_shape();

        if self.config.save_nrrd {
            let total = resolved.len();
            for (k, target) in resolved.targets.iter().enumerate() {
                let path = plan.nrrd_path(target.mz);
                plan.prepare(&path)?;

                let channel = stack.channel(k);
                let image = NrrdImage::new(shape.width, shape.height, channel.values())
                    .with_pixel_size_um(source.pixel_spacing())
                    .with_key_value("mz_value", format!("{:?}", target.mz))
                    .with_key_value("tolerance_ppm", format!("{:?}", report.tolerance_ppm))
                    .with_key_value("source_file", report.source_file.clone());
                let stats = write_nrrd(&path, &image, &self.config.writer_config)?;
                record_output(report, stats);

                if (k + 1) % 10 == 0 || k + 1 == total {
                    info!("  Processed {}/{}: m/z = {:.4}", k + 1, total, target.mz);
                }
            }
            info!("NRRD files saved to: {}", plan.output_dir().display());
        }

        if self.config.save_npy_spatial {
            let path = plan.spatial_path();
            plan.prepare(&path)?;
            let stats = write_npy(&path, &stack.spatial_shape(), stack.data())?;
            info!(
                "Spatial numpy array saved: {} {:?}",
                path.display(),
                stack.spatial_shape()
            );
            record_output(report, stats);
        }

        if self.config.save_npy_list {
            let path = plan.list_path();
            plan.prepare(&path)?;
            let stats = write_npy(&path, &stack.list_shape(), stack.data())?;
            info!(
                "List numpy array saved: {} {:?}",
                path.display(),
                stack.list_shape()
            );
            record_output(report, stats);
        }

        if self.config.writes_arrays() {
            let path = plan.metadata_path();
            plan.prepare(&path)?;
            let stats = write_metadata(&path, report)?;
            info!("Metadata saved: {}", path.display());
            record_output(report, stats);
        }

        if self.config.json_summary {
            let path = plan.summary_path();
            plan.prepare(&path)?;
            let stats = write_summary(&path, report)?;
            record_output(report, stats);
        }

        Ok(())
    }
}

fn record_output(report: &mut ConversionReport, stats: WriterStats) {
    debug!("{}", stats);
    report.bytes_written += stats.file_size_bytes;
    report.outputs.push(stats.path);
}

/// `<base>_metadata.npz`: target list, tolerance, grid size and source name
fn write_metadata(path: &Path, report: &ConversionReport) -> Result<WriterStats, WriterError> {
    let mut npz = NpzWriter::create(path)?;
    npz.add_array("mz_values", &[report.mz_values.len()], &report.mz_values)?;
    npz.add_scalar("tolerance_ppm", report.tolerance_ppm)?;
    npz.add_scalar("image_width", report.image_width as i64)?;
    npz.add_scalar("image_height", report.image_height as i64)?;
    npz.add_str("source_file", &report.source_file)?;
    npz.finish()
}

/// `<base>_summary.json`: the report as written so far
fn write_summary(path: &Path, report: &ConversionReport) -> Result<WriterStats, WriterError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    drop(writer);

    Ok(WriterStats {
        path: PathBuf::from(path),
        elements_written: report.mz_values.len(),
        file_size_bytes: std::fs::metadata(path)?.len(),
    })
}
