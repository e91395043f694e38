/// Errors that can occur during writing
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the zip library while building an `.npz` archive
    #[error("ZIP error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// Error serializing a JSON summary
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid data provided to the writer
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
