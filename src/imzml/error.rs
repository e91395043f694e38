use mzdata::io::mzml::MzMLParserError;
use mzdata::spectrum::bindata::ArrayRetrievalError;

/// Errors that can occur while reading an imzML/ibd pair
#[derive(Debug, thiserror::Error)]
pub enum ImzMLError {
    /// Error scanning the document header
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the mzML/imzML parser
    #[error("imzML parser error: {0}")]
    Parser(#[from] MzMLParserError),

    /// A data array could not be decoded
    #[error("Array decode error: {0}")]
    Array(#[from] ArrayRetrievalError),

    /// Invalid imzML document structure
    #[error("Invalid imzML structure: {0}")]
    InvalidStructure(String),

    /// The `.ibd` file next to the document could not be found
    #[error("Missing .ibd file for imzML: {0}")]
    MissingIbd(String),

    /// The UUID in the document does not match the `.ibd` header
    #[error("UUID mismatch: document declares {document}, .ibd header holds {binary}")]
    UuidMismatch {
        /// UUID declared by the document (IMS:1000080)
        document: String,
        /// UUID stored in the first 16 bytes of the `.ibd` file
        binary: String,
    },
}
