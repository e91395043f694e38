use std::fmt;
use std::path::PathBuf;

/// Statistics from a completed write operation
#[derive(Debug, Clone)]
pub struct WriterStats {
    /// File that was written
    pub path: PathBuf,
    /// Number of array elements written
    pub elements_written: usize,
    /// Total file size in bytes
    pub file_size_bytes: u64,
}

impl fmt::Display for WriterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} ({} elements, {:.2} MB)",
            self.path.display(),
            self.elements_written,
            self.file_size_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}
