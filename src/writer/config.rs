use flate2::Compression;

/// Default gzip level for NRRD payloads
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Configuration for the raster and array writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// gzip level (0-9) for NRRD payloads
    pub gzip_level: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}

impl WriterConfig {
    /// Maximum compression (slower write, smallest files)
    pub fn max_compression() -> Self {
        Self { gzip_level: 9 }
    }

    /// Fast compression (faster write, larger files)
    pub fn fast() -> Self {
        Self { gzip_level: 1 }
    }

    /// Set the gzip level, clamped to 0-9
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level.min(9);
        self
    }

    pub(crate) fn compression(&self) -> Compression {
        Compression::new(self.gzip_level.min(9))
    }
}
