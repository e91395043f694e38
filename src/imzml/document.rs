//! Document-level glue around the imzML parser
//!
//! The parser reads attribute values as UTF-8, while imzML exporters commonly
//! declare `ISO-8859-1` and write `µ` as a single byte. [`Document`] hands the
//! parser a UTF-8 view of such files. [`ImagingHeader`] picks the raster size
//! and pixel size out of `scanSettingsList`, which the parser does not expose.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::ImzMLError;

const MAX_COUNT_OF_PIXELS_X: &str = "IMS:1000042";
const MAX_COUNT_OF_PIXELS_Y: &str = "IMS:1000043";
const PIXEL_SIZE_X: &str = "IMS:1000046";
const PIXEL_SIZE_Y: &str = "IMS:1000047";

/// An imzML document as UTF-8 bytes
pub(crate) enum Document {
    /// Already UTF-8, read straight from disk
    File(File),
    /// Decoded from the declared character set
    Transcoded(Cursor<Vec<u8>>),
}

impl Document {
    pub(crate) fn open(path: &Path) -> Result<Self, ImzMLError> {
        let mut file = File::open(path)?;
        let label = declared_encoding(BufReader::new(&mut file))?;
        file.rewind()?;

        let Some(label) = label else {
            return Ok(Document::File(file));
        };
        let encoding = match Encoding::for_label(label.as_bytes()) {
            Some(encoding) if encoding != UTF_8 => encoding,
            Some(_) => return Ok(Document::File(file)),
            None => {
                warn!("Unknown document encoding '{}'; reading as UTF-8", label);
                return Ok(Document::File(file));
            }
        };

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        debug!("Transcoding {} from {}", path.display(), encoding.name());
        Ok(Document::Transcoded(Cursor::new(transcode(&raw, encoding, &label))))
    }
}

impl Read for Document {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Document::File(file) => file.read(buf),
            Document::Transcoded(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for Document {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Document::File(file) => file.seek(pos),
            Document::Transcoded(cursor) => cursor.seek(pos),
        }
    }
}

/// Encoding label from the XML declaration, if the document has one
fn declared_encoding<R: BufRead>(source: R) -> Result<Option<String>, ImzMLError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let label = match reader.read_event_into(&mut buf)? {
        Event::Decl(decl) => match decl.encoding() {
            Some(Ok(label)) => Some(String::from_utf8_lossy(&label).trim().to_string()),
            _ => None,
        },
        _ => None,
    };
    Ok(label)
}

/// Decode to UTF-8 and relabel the declaration to match
fn transcode(raw: &[u8], encoding: &'static Encoding, label: &str) -> Vec<u8> {
    let (text, _, had_errors) = encoding.decode(raw);
    if had_errors {
        warn!(
            "Document contains bytes that are not valid {}; they were replaced",
            encoding.name()
        );
    }

    let relabeled = match text.find("?>") {
        Some(end) if text.starts_with("<?xml") => {
            format!("{}{}", text[..end].replacen(label, "UTF-8", 1), &text[end..])
        }
        _ => text.into_owned(),
    };
    relabeled.into_bytes()
}

/// Imaging settings declared in `scanSettingsList`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImagingHeader {
    /// Declared raster width (IMS:1000042)
    pub max_count_x: Option<u32>,
    /// Declared raster height (IMS:1000043)
    pub max_count_y: Option<u32>,
    /// Pixel size along x in micrometers (IMS:1000046)
    pub pixel_size_x: Option<f64>,
    /// Pixel size along y in micrometers (IMS:1000047)
    pub pixel_size_y: Option<f64>,
}

impl ImagingHeader {
    /// Scan a UTF-8 document up to `<run>` for the imaging scan settings
    pub fn read<R: BufRead>(source: R) -> Result<Self, ImzMLError> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        let mut header = ImagingHeader::default();
        let mut in_settings = false;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"scanSettings" => in_settings = true,
                    b"run" => break,
                    _ => {}
                },
                Event::End(e) if e.local_name().as_ref() == b"scanSettings" => {
                    in_settings = false
                }
                Event::Empty(e) if in_settings && e.local_name().as_ref() == b"cvParam" => {
                    header.apply(&e, &reader)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(header)
    }

    fn apply<R>(&mut self, param: &BytesStart, reader: &Reader<R>) -> Result<(), ImzMLError> {
        let mut accession = None;
        let mut value = None;
        for attr in param.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.as_ref() {
                b"accession" => {
                    accession = Some(attr.decode_and_unescape_value(reader.decoder())?.into_owned())
                }
                b"value" => {
                    value = Some(attr.decode_and_unescape_value(reader.decoder())?.into_owned())
                }
                _ => {}
            }
        }
        let (Some(accession), Some(value)) = (accession, value) else {
            return Ok(());
        };
        let value = value.trim();

        match accession.as_str() {
            MAX_COUNT_OF_PIXELS_X => self.max_count_x = parse_count(&accession, value),
            MAX_COUNT_OF_PIXELS_Y => self.max_count_y = parse_count(&accession, value),
            PIXEL_SIZE_X => self.pixel_size_x = value.parse().ok(),
            PIXEL_SIZE_Y => self.pixel_size_y = value.parse().ok(),
            _ => {}
        }
        Ok(())
    }

    /// Pixel size in micrometers when both axes are declared and positive
    pub fn pixel_size(&self) -> Option<(f64, f64)> {
        match (self.pixel_size_x, self.pixel_size_y) {
            (Some(x), Some(y)) if x > 0.0 && y > 0.0 => Some((x, y)),
            (Some(x), None) if x > 0.0 => Some((x, x)),
            _ => None,
        }
    }
}

fn parse_count(accession: &str, value: &str) -> Option<u32> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        warn!("Ignoring {} with non-integer value '{}'", accession, value);
    }
    parsed
}
