//! Tolerance-window intensity extraction
//!
//! Every pixel spectrum is read once and all targets are evaluated against
//! it. Sorted m/z arrays are searched with `partition_point`; unsorted ones
//! fall back to a linear scan with the same result.

use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::assemble::{IntensityGrid, StackedArray};
use super::targets::Target;
use super::ConversionError;
use crate::source::{GridShape, ImagingSource, Spectrum};

/// How the samples inside a tolerance window become one intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityStrategy {
    /// Sum of all intensities in the window
    #[default]
    Sum,
    /// Largest intensity in the window
    Max,
    /// Intensity of the sample closest to the target m/z
    Nearest,
}

impl fmt::Display for IntensityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityStrategy::Sum => write!(f, "sum"),
            IntensityStrategy::Max => write!(f, "max"),
            IntensityStrategy::Nearest => write!(f, "nearest"),
        }
    }
}

/// Index range of samples inside `[lower, upper]` for a sorted m/z array
fn sorted_window(mz: &[f64], lower: f64, upper: f64) -> std::ops::Range<usize> {
    let start = mz.partition_point(|&m| m < lower);
    let end = mz.partition_point(|&m| m <= upper);
    start..end.max(start)
}

/// Fold the samples selected by `indices` with `strategy`
fn fold_window<I>(
    spectrum: &Spectrum,
    target: &Target,
    indices: I,
    strategy: IntensityStrategy,
) -> f64
where
    I: Iterator<Item = usize>,
{
    match strategy {
        IntensityStrategy::Sum => indices.map(|i| spectrum.intensity[i]).sum(),
        IntensityStrategy::Max => indices
            .map(|i| spectrum.intensity[i])
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
            .unwrap_or(0.0),
        IntensityStrategy::Nearest => {
            let mut best: Option<(f64, f64)> = None;
            for i in indices {
                let distance = (spectrum.mz[i] - target.mz).abs();
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, spectrum.intensity[i]));
                }
            }
            best.map_or(0.0, |(_, v)| v)
        }
    }
}

/// Intensity of one target in one spectrum. An empty window gives 0.
pub fn window_intensity(spectrum: &Spectrum, target: &Target, strategy: IntensityStrategy) -> f32 {
    let sorted = spectrum.is_sorted();
    window_intensity_with(spectrum, target, strategy, sorted)
}

fn window_intensity_with(
    spectrum: &Spectrum,
    target: &Target,
    strategy: IntensityStrategy,
    sorted: bool,
) -> f32 {
    let n = spectrum.len();
    let (lower, upper) = target.bounds();
    let value = if sorted {
        let range = sorted_window(&spectrum.mz[..n], lower, upper);
        fold_window(spectrum, target, range, strategy)
    } else {
        let indices = (0..n).filter(|&i| {
            let mz = spectrum.mz[i];
            mz >= lower && mz <= upper
        });
        fold_window(spectrum, target, indices, strategy)
    };
    value as f32
}

/// Evaluate every target against one spectrum, writing one value per target
pub fn evaluate_spectrum(
    spectrum: &Spectrum,
    targets: &[Target],
    strategy: IntensityStrategy,
    out: &mut [f32],
) {
    let sorted = spectrum.is_sorted();
    for (slot, target) in out.iter_mut().zip(targets) {
        *slot = window_intensity_with(spectrum, target, strategy, sorted);
    }
}

/// Grid index of every pixel the source lists, `None` when off-grid
fn pixel_slots<S: ImagingSource + ?Sized>(source: &S, shape: GridShape) -> Vec<Option<usize>> {
    let slots: Vec<Option<usize>> = source
        .pixels()
        .iter()
        .map(|p| p.grid_index(shape))
        .collect();
    let off_grid = slots.iter().filter(|s| s.is_none()).count();
    if off_grid > 0 {
        warn!(
            "{} spectra lie outside the {}x{} grid and are skipped",
            off_grid, shape.width, shape.height
        );
    }
    slots
}

fn check_not_empty<S: ImagingSource + ?Sized>(
    source: &S,
    shape: GridShape,
) -> Result<(), ConversionError> {
    if source.pixel_count() == 0 || shape.is_empty() {
        return Err(ConversionError::EmptyAcquisition(format!(
            "{} has no pixels ({} spectra, {}x{} grid)",
            source.source_name(),
            source.pixel_count(),
            shape.width,
            shape.height
        )));
    }
    Ok(())
}

/// Extract all targets in a single pass over the source
pub fn extract_stack<S: ImagingSource + ?Sized>(
    source: &mut S,
    targets: &[Target],
    strategy: IntensityStrategy,
    batch_size: usize,
    progress_interval: usize,
) -> Result<StackedArray, ConversionError> {
    let shape = source.dimensions();
    check_not_empty(source, shape)?;
    if targets.is_empty() {
        return Err(ConversionError::NoTargets("nothing to extract".to_string()));
    }

    let slots = pixel_slots(source, shape);
    let total = slots.len();
    let mut stack = StackedArray::zeros(shape, targets.len());

    info!(
        "Extracting {} targets from {} spectra ({} strategy)...",
        targets.len(),
        total,
        strategy
    );

    let batch_size = batch_size.max(1);
    let progress_interval = progress_interval.max(1);
    let mut done = 0usize;
    let mut next_report = progress_interval;

    for batch_start in (0..total).step_by(batch_size) {
        let batch_end = (batch_start + batch_size).min(total);

        // Reads stay sequential; only window evaluation may fan out
        let mut batch: Vec<(usize, Spectrum)> = Vec::with_capacity(batch_end - batch_start);
        for (index, slot) in slots.iter().enumerate().take(batch_end).skip(batch_start) {
            if let Some(slot) = slot {
                batch.push((*slot, source.read_spectrum(index)?));
            }
        }

        evaluate_batch(&batch, targets, strategy, &mut stack);

        done = batch_end;
        if done >= next_report {
            let pct = (done as f64 / total as f64) * 100.0;
            info!("Progress: {}/{} spectra ({:.1}%)", done, total, pct);
            next_report = (done / progress_interval + 1) * progress_interval;
        }
    }

    debug!("Extraction finished after {} spectra", done);
    Ok(stack)
}

#[cfg(not(feature = "parallel"))]
fn evaluate_batch(
    batch: &[(usize, Spectrum)],
    targets: &[Target],
    strategy: IntensityStrategy,
    stack: &mut StackedArray,
) {
    for (slot, spectrum) in batch {
        evaluate_spectrum(spectrum, targets, strategy, stack.pixel_mut(*slot));
    }
}

#[cfg(feature = "parallel")]
fn evaluate_batch(
    batch: &[(usize, Spectrum)],
    targets: &[Target],
    strategy: IntensityStrategy,
    stack: &mut StackedArray,
) {
    use rayon::prelude::*;

    let rows: Vec<Vec<f32>> = batch
        .par_iter()
        .map(|(_, spectrum)| {
            let mut row = vec![0.0f32; targets.len()];
            evaluate_spectrum(spectrum, targets, strategy, &mut row);
            row
        })
        .collect();

    // Written in batch order so a repeated pixel resolves like the sequential path
    for ((slot, _), row) in batch.iter().zip(rows) {
        stack.pixel_mut(*slot).copy_from_slice(&row);
    }
}

/// Extract one target into its own grid
pub fn extract_grid<S: ImagingSource + ?Sized>(
    source: &mut S,
    target: &Target,
    strategy: IntensityStrategy,
) -> Result<IntensityGrid, ConversionError> {
    let shape = source.dimensions();
    check_not_empty(source, shape)?;

    let slots = pixel_slots(source, shape);
    let mut grid = IntensityGrid::zeros(shape);
    for (index, slot) in slots.iter().enumerate() {
        if let Some(slot) = slot {
            let spectrum = source.read_spectrum(index)?;
            grid.values_mut()[*slot] = window_intensity(&spectrum, target, strategy);
        }
    }
    Ok(grid)
}
