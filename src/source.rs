//! Imaging source abstraction
//!
//! The conversion pipeline only needs a handful of things from an opened
//! acquisition: the grid, which pixel each spectrum belongs to, the spectrum
//! representation, the embedded centroid list and the spectra themselves.
//! [`ImagingSource`] captures exactly that, so the pipeline can run against
//! the imzML reader or an in-memory source in tests.

use serde::{Deserialize, Serialize};

use crate::imzml::ImzMLError;

/// Spectrum representation declared by the acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumType {
    /// Peak lists (MS:1000127)
    Centroid,
    /// Continuous profile data (MS:1000128)
    Profile,
    /// Not declared, or mixed
    #[default]
    Unknown,
}

impl std::fmt::Display for SpectrumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumType::Centroid => write!(f, "centroid"),
            SpectrumType::Profile => write!(f, "profile"),
            SpectrumType::Unknown => write!(f, "unknown"),
        }
    }
}

/// 1-based pixel position as stored in imzML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelCoord {
    /// Column, starting at 1
    pub x: u32,
    /// Row, starting at 1
    pub y: u32,
}

impl PixelCoord {
    /// Position at column `x`, row `y`
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Row-major index of this pixel in a grid, if it lies inside it
    pub fn grid_index(&self, shape: GridShape) -> Option<usize> {
        if self.x == 0 || self.y == 0 {
            return None;
        }
        let col = (self.x - 1) as usize;
        let row = (self.y - 1) as usize;
        if col >= shape.width || row >= shape.height {
            return None;
        }
        Some(row * shape.width + col)
    }
}

/// Raster dimensions of an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of rows
    pub height: usize,
    /// Number of columns
    pub width: usize,
}

impl GridShape {
    /// Shape from rows and columns, in that order
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of raster cells
    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    /// A grid with no cells
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }
}

/// One decoded spectrum
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// m/z values
    pub mz: Vec<f64>,
    /// Intensity values, same length as `mz`
    pub intensity: Vec<f64>,
}

impl Spectrum {
    /// Spectrum from parallel arrays
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self { mz, intensity }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.mz.len().min(self.intensity.len())
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether m/z values are in non-decreasing order
    pub fn is_sorted(&self) -> bool {
        self.mz.windows(2).all(|w| w[0] <= w[1])
    }
}

/// An opened imaging acquisition.
///
/// Pixel `i` (as listed by [`ImagingSource::pixels`]) is the position of
/// spectrum `i` (as read by [`ImagingSource::read_spectrum`]).
pub trait ImagingSource {
    /// File name used in output metadata
    fn source_name(&self) -> &str;

    /// Raster dimensions
    fn dimensions(&self) -> GridShape;

    /// Position of every spectrum, in spectrum order
    fn pixels(&self) -> &[PixelCoord];

    /// Spectrum representation of the acquisition
    fn spectrum_type(&self) -> SpectrumType;

    /// Centroid m/z list embedded in the acquisition, in source order
    fn centroids(&mut self) -> Result<Vec<f64>, ImzMLError>;

    /// Decode the spectrum of pixel `index`
    fn read_spectrum(&mut self, index: usize) -> Result<Spectrum, ImzMLError>;

    /// Physical pixel size in micrometers (x, y), when declared
    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        None
    }

    /// Number of spectra
    fn pixel_count(&self) -> usize {
        self.pixels().len()
    }
}

/// An acquisition held in memory
///
/// Handy for tests and benchmarks. Without an explicit centroid list the
/// centroids are the ascending distinct m/z values over all spectra.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    shape: GridShape,
    spectrum_type: SpectrumType,
    pixels: Vec<PixelCoord>,
    spectra: Vec<Spectrum>,
    centroids: Option<Vec<f64>>,
    pixel_spacing: Option<(f64, f64)>,
}

impl MemorySource {
    /// An empty source with the given name, raster and spectrum type
    pub fn new(name: impl Into<String>, shape: GridShape, spectrum_type: SpectrumType) -> Self {
        Self {
            name: name.into(),
            shape,
            spectrum_type,
            pixels: Vec::new(),
            spectra: Vec::new(),
            centroids: None,
            pixel_spacing: None,
        }
    }

    /// Add the spectrum of one pixel
    pub fn with_spectrum(mut self, pixel: PixelCoord, spectrum: Spectrum) -> Self {
        self.push(pixel, spectrum);
        self
    }

    /// Set the embedded centroid list
    pub fn with_centroids(mut self, centroids: Vec<f64>) -> Self {
        self.centroids = Some(centroids);
        self
    }

    /// Set the pixel size in micrometers
    pub fn with_pixel_spacing(mut self, x: f64, y: f64) -> Self {
        self.pixel_spacing = Some((x, y));
        self
    }

    /// Add the spectrum of one pixel in place
    pub fn push(&mut self, pixel: PixelCoord, spectrum: Spectrum) {
        self.pixels.push(pixel);
        self.spectra.push(spectrum);
    }
}

impl ImagingSource for MemorySource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> GridShape {
        self.shape
    }

    fn pixels(&self) -> &[PixelCoord] {
        &self.pixels
    }

    fn spectrum_type(&self) -> SpectrumType {
        self.spectrum_type
    }

    fn centroids(&mut self) -> Result<Vec<f64>, ImzMLError> {
        if let Some(centroids) = &self.centroids {
            return Ok(centroids.clone());
        }
        let mut union: Vec<f64> = self
            .spectra
            .iter()
            .flat_map(|s| s.mz.iter().copied())
            .filter(|v| v.is_finite())
            .collect();
        union.sort_by(|a, b| a.total_cmp(b));
        union.dedup();
        Ok(union)
    }

    fn read_spectrum(&mut self, index: usize) -> Result<Spectrum, ImzMLError> {
        self.spectra.get(index).cloned().ok_or_else(|| {
            ImzMLError::InvalidStructure(format!("spectrum index {index} out of range"))
        })
    }

    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        self.pixel_spacing
    }
}
