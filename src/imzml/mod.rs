//! # imzML Reader Module
//!
//! imzML stores a mass spectrometry imaging acquisition as two files: an
//! mzML-flavoured XML document describing every spectrum, and an `.ibd`
//! binary file holding the m/z and intensity arrays.
//!
//! Parsing is done by the [`mzdata`] imzML reader. This module adds what the
//! raster conversion needs on top of it:
//!
//! - pixel positions (IMS:1000050/51/52) from each spectrum's scan params
//! - the declared raster and pixel size from `scanSettingsList`
//! - a hard UUID check between the document and the `.ibd` header
//! - UTF-8 transcoding for documents declared in another character set
//!
//! ```text
//! mzML
//! ├── fileDescription/fileContent   UUID, storage mode, centroid/profile
//! ├── scanSettingsList              grid size, pixel size
//! └── run/spectrumList/spectrum*    one per pixel, position in scan params
//!
//! .ibd
//! ├── 16-byte UUID
//! └── array data addressed by external offset
//! ```

mod document;
mod error;
mod reader;

pub use document::ImagingHeader;
pub use error::ImzMLError;
pub use reader::{find_ibd_path, ImzMLReader, StorageMode};
