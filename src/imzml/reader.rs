//! imzML reader
//!
//! Wraps the `mzdata` imzML parser as an [`ImagingSource`]. Opening a file
//! walks the spectrum list once without touching the `.ibd` data, to learn
//! the pixel of every spectrum. Spectra are then decoded by streaming
//! forward through the document.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use mzdata::io::imzml::reader::IbdDataMode;
use mzdata::io::imzml::ImzMLReader as MzDataImzMLReader;
use mzdata::io::mzml::MzMLParserError;
use mzdata::io::DetailLevel;
use mzdata::params::{ControlledVocabulary, Param};
use mzdata::prelude::*;
use mzdata::spectrum::bindata::ArrayType;
use mzdata::spectrum::{MultiLayerSpectrum, SignalContinuity};
use uuid::Uuid;

use super::document::{Document, ImagingHeader};
use super::error::ImzMLError;
use crate::source::{GridShape, ImagingSource, PixelCoord, Spectrum, SpectrumType};

type Backend = MzDataImzMLReader<Document, File>;

const BUFFER_CAPACITY: usize = 1 << 16;

const POSITION_X: u32 = 1_000_050;
const POSITION_Y: u32 = 1_000_051;
const POSITION_Z: u32 = 1_000_052;
const CENTROID_SPECTRUM: u32 = 1_000_127;
const PROFILE_SPECTRUM: u32 = 1_000_128;

/// Binary storage layout declared in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// All spectra share one m/z array (IMS:1000030)
    Continuous,
    /// Every spectrum has its own m/z array (IMS:1000031)
    Processed,
    /// Not declared
    #[default]
    Unknown,
}

impl From<Option<IbdDataMode>> for StorageMode {
    fn from(mode: Option<IbdDataMode>) -> Self {
        match mode {
            Some(IbdDataMode::Continuous) => StorageMode::Continuous,
            Some(IbdDataMode::Processed) => StorageMode::Processed,
            _ => StorageMode::Unknown,
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Continuous => write!(f, "continuous"),
            StorageMode::Processed => write!(f, "processed"),
            StorageMode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Locate the `.ibd` file next to an imzML document
pub fn find_ibd_path(path: &Path) -> Option<PathBuf> {
    [path.with_extension("ibd"), path.with_extension("IBD")]
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// What the layout pass learns about one spectrum
#[derive(Debug, Clone)]
struct IndexedSpectrum {
    ordinal: usize,
    id: String,
    position: PixelCoord,
    z: Option<u32>,
    spectrum_type: SpectrumType,
}

/// Forward-only position in the spectrum list
struct SpectrumCursor {
    backend: Backend,
    next: usize,
}

impl SpectrumCursor {
    fn open(path: &Path, ibd_path: &Path, detail_level: DetailLevel) -> Result<Self, ImzMLError> {
        let backend = Backend::with_buffer_capacity_and_detail_level(
            Document::open(path)?,
            File::open(ibd_path)?,
            BUFFER_CAPACITY,
            detail_level,
        );
        Ok(Self { backend, next: 0 })
    }

    /// Next spectrum in document order, `None` at the end of the list
    fn read_next(&mut self) -> Result<Option<MultiLayerSpectrum>, ImzMLError> {
        let mut spectrum = MultiLayerSpectrum::default();
        match self.backend.read_into(&mut spectrum) {
            Ok(_) => {
                self.next += 1;
                Ok(Some(spectrum))
            }
            Err(MzMLParserError::EOF | MzMLParserError::SectionOver(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Skip forward to spectrum `ordinal` and decode it
    fn advance_to(&mut self, ordinal: usize) -> Result<MultiLayerSpectrum, ImzMLError> {
        if self.next < ordinal {
            let detail_level = self.backend.detail_level;
            self.backend.detail_level = DetailLevel::MetadataOnly;
            while self.next < ordinal {
                if self.read_next()?.is_none() {
                    break;
                }
            }
            self.backend.detail_level = detail_level;
        }
        self.read_next()?.ok_or_else(|| {
            ImzMLError::InvalidStructure(format!(
                "spectrum list ended before spectrum {ordinal}"
            ))
        })
    }
}

/// An opened imzML/ibd pair
pub struct ImzMLReader {
    path: PathBuf,
    ibd_path: PathBuf,
    source_name: String,
    header: ImagingHeader,
    storage_mode: StorageMode,
    ordinals: Vec<usize>,
    pixels: Vec<PixelCoord>,
    shape: GridShape,
    spectrum_type: SpectrumType,
    cursor: SpectrumCursor,
}

impl ImzMLReader {
    /// Open an imzML document and the `.ibd` file next to it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImzMLError> {
        let path = path.as_ref().to_path_buf();
        let ibd_path = find_ibd_path(&path)
            .ok_or_else(|| ImzMLError::MissingIbd(path.display().to_string()))?;

        let mut document = Document::open(&path)?;
        let header = ImagingHeader::read(BufReader::new(&mut document))?;
        document.rewind()?;

        let mut layout = SpectrumCursor {
            backend: Backend::with_buffer_capacity_and_detail_level(
                document,
                File::open(&ibd_path)?,
                BUFFER_CAPACITY,
                DetailLevel::MetadataOnly,
            ),
            next: 0,
        };
        check_uuid(layout.backend.imzml_metadata.uuid, &ibd_path)?;
        let storage_mode = StorageMode::from(layout.backend.imzml_metadata.data_mode);
        let declared_type = declared_spectrum_type(layout.backend.file_description().params());

        let spectra = index_spectra(&mut layout)?;
        let ordinals: Vec<usize> = spectra.iter().map(|s| s.ordinal).collect();
        let pixels: Vec<PixelCoord> = spectra.iter().map(|s| s.position).collect();
        let shape = grid_shape(&header, &pixels);
        let spectrum_type = declared_type.unwrap_or_else(|| aggregate_spectrum_type(&spectra));

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(
            "Opened {}: {} pixels, {}x{} grid, {} storage, {} spectra",
            source_name,
            pixels.len(),
            shape.width,
            shape.height,
            storage_mode,
            spectrum_type
        );

        let cursor = SpectrumCursor::open(&path, &ibd_path, DetailLevel::Lazy)?;
        Ok(Self {
            path,
            ibd_path,
            source_name,
            header,
            storage_mode,
            ordinals,
            pixels,
            shape,
            spectrum_type,
            cursor,
        })
    }

    /// Storage mode declared in the document
    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }
}

impl ImagingSource for ImzMLReader {
    fn source_name(&self) -> &str {
        &self.source_name
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
        if self.pixels.is_empty() {
            return Ok(Vec::new());
        }
        if self.storage_mode == StorageMode::Continuous {
            return Ok(self.read_spectrum(0)?.mz);
        }

        let mut union = Vec::new();
        for index in 0..self.pixels.len() {
            union.extend(self.read_spectrum(index)?.mz);
        }
        union.retain(|v: &f64| v.is_finite());
        union.sort_by(|a, b| a.total_cmp(b));
        union.dedup();
        debug!(
            "Collected {} distinct centroid m/z values from {} spectra",
            union.len(),
            self.pixels.len()
        );
        Ok(union)
    }

    fn read_spectrum(&mut self, index: usize) -> Result<Spectrum, ImzMLError> {
        let ordinal = *self.ordinals.get(index).ok_or_else(|| {
            ImzMLError::InvalidStructure(format!("spectrum index {index} out of range"))
        })?;
        if self.cursor.next > ordinal {
            debug!("Rewinding {} to spectrum {}", self.source_name, ordinal);
            self.cursor = SpectrumCursor::open(&self.path, &self.ibd_path, DetailLevel::Lazy)?;
        }
        let spectrum = self.cursor.advance_to(ordinal)?;
        decode_arrays(&spectrum)
    }

    fn pixel_spacing(&self) -> Option<(f64, f64)> {
        self.header.pixel_size()
    }
}

/// Walk the spectrum list once, keeping the last spectrum seen at each pixel
fn index_spectra(layout: &mut SpectrumCursor) -> Result<Vec<IndexedSpectrum>, ImzMLError> {
    let mut spectra: Vec<Option<IndexedSpectrum>> = Vec::new();
    let mut slot_by_position: HashMap<PixelCoord, usize> = HashMap::new();
    let mut z_slices: BTreeSet<u32> = BTreeSet::new();
    let mut collapsed = 0usize;

    while let Some(spectrum) = layout.read_next()? {
        let entry = index_entry(layout.next - 1, &spectrum)?;
        if let Some(z) = entry.z {
            z_slices.insert(z);
        }

        if let Some(&slot) = slot_by_position.get(&entry.position) {
            if let Some(previous) = spectra[slot].take() {
                if previous.z == entry.z {
                    warn!(
                        "Spectrum '{}' repeats pixel ({}, {}); it replaces '{}'",
                        entry.id, entry.position.x, entry.position.y, previous.id
                    );
                } else {
                    collapsed += 1;
                }
            }
        }
        slot_by_position.insert(entry.position, spectra.len());
        spectra.push(Some(entry));
    }

    if z_slices.len() > 1 {
        warn!(
            "3-D acquisition with {} z-slices; rasterizing x/y only, {} spectra from \
             earlier slices were replaced by later ones",
            z_slices.len(),
            collapsed
        );
    }

    Ok(spectra.into_iter().flatten().collect())
}

fn index_entry(ordinal: usize, spectrum: &MultiLayerSpectrum) -> Result<IndexedSpectrum, ImzMLError> {
    let id = spectrum.id().to_string();
    let scan_params: &[Param] = match spectrum.acquisition().first_scan() {
        Some(scan) => scan.params(),
        None => &[],
    };

    let x: Option<i64> = ims_value(scan_params, POSITION_X);
    let y: Option<i64> = ims_value(scan_params, POSITION_Y);
    let position = match (x, y) {
        (Some(x), Some(y)) if (1..=u32::MAX as i64).contains(&x)
            && (1..=u32::MAX as i64).contains(&y) =>
        {
            PixelCoord::new(x as u32, y as u32)
        }
        (Some(x), Some(y)) => {
            return Err(ImzMLError::InvalidStructure(format!(
                "spectrum '{id}' has out-of-range position ({x}, {y}); positions are 1-based"
            )))
        }
        _ => {
            return Err(ImzMLError::InvalidStructure(format!(
                "spectrum '{id}' has no pixel position"
            )))
        }
    };

    let spectrum_type = match spectrum.signal_continuity() {
        SignalContinuity::Centroid => SpectrumType::Centroid,
        SignalContinuity::Profile => SpectrumType::Profile,
        _ => SpectrumType::Unknown,
    };

    Ok(IndexedSpectrum {
        ordinal,
        id,
        position,
        z: ims_value(scan_params, POSITION_Z),
        spectrum_type,
    })
}

/// m/z and intensity arrays of a decoded spectrum
fn decode_arrays(spectrum: &MultiLayerSpectrum) -> Result<Spectrum, ImzMLError> {
    let missing = || {
        ImzMLError::InvalidStructure(format!(
            "spectrum '{}' lacks an m/z or intensity array",
            spectrum.id()
        ))
    };
    let arrays = spectrum.raw_arrays().ok_or_else(missing)?;
    let mz = arrays.get(&ArrayType::MZArray).ok_or_else(missing)?.to_f64()?;
    let intensity = arrays
        .get(&ArrayType::IntensityArray)
        .ok_or_else(missing)?
        .to_f64()?;

    if mz.len() != intensity.len() {
        return Err(ImzMLError::InvalidStructure(format!(
            "spectrum '{}' has {} m/z values but {} intensities",
            spectrum.id(),
            mz.len(),
            intensity.len()
        )));
    }
    Ok(Spectrum::new(mz.into_owned(), intensity.into_owned()))
}

fn find_param(params: &[Param], cv: ControlledVocabulary, accession: u32) -> Option<&Param> {
    params
        .iter()
        .find(|p| p.controlled_vocabulary == Some(cv) && p.accession == Some(accession))
}

fn ims_value<T: FromStr>(params: &[Param], accession: u32) -> Option<T> {
    find_param(params, ControlledVocabulary::IMS, accession)
        .and_then(|p| p.value.to_string().trim().parse().ok())
}

/// Spectrum type declared in `fileContent`
fn declared_spectrum_type(params: &[Param]) -> Option<SpectrumType> {
    if find_param(params, ControlledVocabulary::MS, CENTROID_SPECTRUM).is_some() {
        Some(SpectrumType::Centroid)
    } else if find_param(params, ControlledVocabulary::MS, PROFILE_SPECTRUM).is_some() {
        Some(SpectrumType::Profile)
    } else {
        None
    }
}

/// Compare the document UUID with the `.ibd` header when the document has one
fn check_uuid(declared: Option<Uuid>, ibd_path: &Path) -> Result<(), ImzMLError> {
    let Some(declared) = declared else {
        debug!("imzML document declares no UUID");
        return Ok(());
    };

    let mut header = [0u8; 16];
    File::open(ibd_path)?.read_exact(&mut header).map_err(|_| {
        ImzMLError::InvalidStructure(format!(
            "{} is shorter than its 16-byte UUID header",
            ibd_path.display()
        ))
    })?;
    let binary = Uuid::from_bytes(header);
    if binary != declared {
        return Err(ImzMLError::UuidMismatch {
            document: declared.to_string(),
            binary: binary.to_string(),
        });
    }
    Ok(())
}

/// Declared grid size, widened to cover every observed position
fn grid_shape(header: &ImagingHeader, pixels: &[PixelCoord]) -> GridShape {
    let observed_x = pixels.iter().map(|p| p.x).max().unwrap_or(0);
    let observed_y = pixels.iter().map(|p| p.y).max().unwrap_or(0);
    let width = header.max_count_x.unwrap_or(0).max(observed_x);
    let height = header.max_count_y.unwrap_or(0).max(observed_y);

    if header.max_count_x.is_some_and(|x| x < observed_x)
        || header.max_count_y.is_some_and(|y| y < observed_y)
    {
        warn!(
            "Pixel positions exceed the declared {}x{} grid; using {}x{}",
            header.max_count_x.unwrap_or(0),
            header.max_count_y.unwrap_or(0),
            width,
            height
        );
    }

    GridShape::new(height as usize, width as usize)
}

/// Spectrum type when the document does not declare one at file level
fn aggregate_spectrum_type(spectra: &[IndexedSpectrum]) -> SpectrumType {
    let mut types = spectra.iter().map(|s| s.spectrum_type);
    match types.next() {
        Some(first) if first != SpectrumType::Unknown && types.all(|t| t == first) => first,
        _ => SpectrumType::Unknown,
    }
}
