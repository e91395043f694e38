use std::fmt;

use log::{debug, info};
use serde::Serialize;

use super::ConversionError;
use crate::source::{ImagingSource, SpectrumType};

/// Relative m/z window in parts per million
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    ppm: f64,
}

impl Tolerance {
    /// A ppm tolerance; must be finite and non-negative
    pub fn from_ppm(ppm: f64) -> Result<Self, ConversionError> {
        if !ppm.is_finite() || ppm < 0.0 {
            return Err(ConversionError::InvalidArgument(format!(
                "tolerance must be a finite, non-negative ppm value (got {ppm})"
            )));
        }
        Ok(Self { ppm })
    }

    /// Window size in ppm
    pub fn ppm(&self) -> f64 {
        self.ppm
    }

    /// Half-width of the window around `mz`
    pub fn half_width(&self, mz: f64) -> f64 {
        mz * self.ppm * 1e-6
    }

    /// Inclusive `(lower, upper)` bounds around `mz`
    pub fn bounds(&self, mz: f64) -> (f64, f64) {
        let delta = self.half_width(mz);
        (mz - delta, mz + delta)
    }
}

/// One channel to extract
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Target {
    /// Center of the window
    pub mz: f64,
    /// Window around `mz`
    pub tolerance: Tolerance,
}

impl Target {
    /// A target centered on `mz`
    pub fn new(mz: f64, tolerance: Tolerance) -> Self {
        Self { mz, tolerance }
    }

    /// Inclusive window bounds
    pub fn bounds(&self) -> (f64, f64) {
        self.tolerance.bounds(self.mz)
    }

    /// Whether `mz` falls inside the window
    pub fn contains(&self, mz: f64) -> bool {
        let (lower, upper) = self.bounds();
        mz >= lower && mz <= upper
    }
}

/// Where a target list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOrigin {
    /// Supplied by the caller
    #[default]
    Explicit,
    /// The centroid list embedded in the input
    Embedded,
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Explicit => write!(f, "explicit"),
            TargetOrigin::Embedded => write!(f, "embedded centroids"),
        }
    }
}

/// Resolved, non-empty target list
#[derive(Debug, Clone)]
pub struct ResolvedTargets {
    /// Targets in output channel order
    pub targets: Vec<Target>,
    /// Where the m/z values came from
    pub origin: TargetOrigin,
}

impl ResolvedTargets {
    /// Target m/z values in channel order
    pub fn mz_values(&self) -> Vec<f64> {
        self.targets.iter().map(|t| t.mz).collect()
    }

    /// Number of targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no targets
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Resolve the targets of a run.
///
/// Explicit values are used as given, in order, duplicates included. Without
/// them the source must be a centroid acquisition with pixels, and its
/// embedded centroid list is used in the order the source reports it.
pub fn resolve_targets<S: ImagingSource + ?Sized>(
    source: &mut S,
    explicit: Option<&[f64]>,
    tolerance: Tolerance,
) -> Result<ResolvedTargets, ConversionError> {
    if let Some(values) = explicit {
        if values.is_empty() {
            return Err(ConversionError::InvalidArgument(
                "explicit centroid list is empty".to_string(),
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(ConversionError::InvalidArgument(format!(
                "centroid m/z values must be finite and positive (got {bad})"
            )));
        }
        info!("Using {} provided centroid values", values.len());
        return Ok(ResolvedTargets {
            targets: values.iter().map(|&mz| Target::new(mz, tolerance)).collect(),
            origin: TargetOrigin::Explicit,
        });
    }

    let spectrum_type = source.spectrum_type();
    if spectrum_type != SpectrumType::Centroid {
        return Err(ConversionError::UnsupportedFormat(format!(
            "{} is not a centroid acquisition ({}); pass --centroids explicitly",
            source.source_name(),
            spectrum_type
        )));
    }
    if source.pixel_count() == 0 {
        return Err(ConversionError::EmptyAcquisition(format!(
            "{} contains no spectra",
            source.source_name()
        )));
    }

    let centroids = source.centroids()?;
    if centroids.is_empty() {
        return Err(ConversionError::NoTargets(format!(
            "{} has an empty centroid list; pass --centroids explicitly",
            source.source_name()
        )));
    }
    debug!(
        "Embedded centroid range: {:?} .. {:?}",
        centroids.first(),
        centroids.last()
    );
    info!("Using {} centroids from centroid imzML file", centroids.len());

    Ok(ResolvedTargets {
        targets: centroids
            .into_iter()
            .map(|mz| Target::new(mz, tolerance))
            .collect(),
        origin: TargetOrigin::Embedded,
    })
}
