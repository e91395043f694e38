use std::fs;
use std::path::{Path, PathBuf};

use crate::writer::WriterError;

/// Where every output file of a run goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    output_dir: PathBuf,
    input_stem: String,
    /// `<dir>/<name>` without extension; array outputs append suffixes to it
    array_base: PathBuf,
}

impl OutputPlan {
    /// Plan outputs for `input`.
    ///
    /// `output_dir` defaults to the input's directory. `npy_output` replaces
    /// the default `<input_stem>_data` array base name; it is resolved under
    /// the output directory and its extension is dropped.
    pub fn new(input: &Path, output_dir: Option<&Path>, npy_output: Option<&str>) -> Self {
        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        let input_stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        let array_base = match npy_output {
            Some(name) => {
                let joined = output_dir.join(name);
                let stem = joined
                    .file_stem()
                    .map(|s| s.to_os_string())
                    .unwrap_or_else(|| format!("{input_stem}_data").into());
                match joined.parent() {
                    Some(parent) => parent.join(stem),
                    None => PathBuf::from(stem),
                }
            }
            None => output_dir.join(format!("{input_stem}_data")),
        };

        Self {
            output_dir,
            input_stem,
            array_base,
        }
    }

    /// Directory every output lands in
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<dir>/<input_stem>_mz_<mz:.4>.nrrd`
    pub fn nrrd_path(&self, mz: f64) -> PathBuf {
        self.output_dir
            .join(format!("{}_mz_{:.4}.nrrd", self.input_stem, mz))
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .array_base
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.array_base.with_file_name(name)
    }

    /// `<base>_spatial.npy`
    pub fn spatial_path(&self) -> PathBuf {
        self.with_suffix("_spatial.npy")
    }

    /// `<base>_list.npy`
    pub fn list_path(&self) -> PathBuf {
        self.with_suffix("_list.npy")
    }

    /// `<base>_metadata.npz`
    pub fn metadata_path(&self) -> PathBuf {
        self.with_suffix("_metadata.npz")
    }

    /// `<base>_summary.json`
    pub fn summary_path(&self) -> PathBuf {
        self.with_suffix("_summary.json")
    }

    /// Create the directory that will hold `path`
    pub fn prepare(&self, path: &Path) -> Result<(), WriterError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let plan = OutputPlan::new(Path::new("/data/run1.imzML"), None, None);

        assert_eq!(plan.output_dir(), Path::new("/data"));
        assert_eq!(
            plan.nrrd_path(500.0),
            PathBuf::from("/data/run1_mz_500.0000.nrrd")
        );
        assert_eq!(
            plan.nrrd_path(123.456789),
            PathBuf::from("/data/run1_mz_123.4568.nrrd")
        );
        assert_eq!(
            plan.spatial_path(),
            PathBuf::from("/data/run1_data_spatial.npy")
        );
        assert_eq!(plan.list_path(), PathBuf::from("/data/run1_data_list.npy"));
        assert_eq!(
            plan.metadata_path(),
            PathBuf::from("/data/run1_data_metadata.npz")
        );
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let plan = OutputPlan::new(Path::new("run1.imzML"), None, None);
        assert_eq!(plan.output_dir(), Path::new("."));
    }

    #[test]
    fn test_npy_output_override() {
        let plan = OutputPlan::new(
            Path::new("/data/run1.imzML"),
            Some(Path::new("/out")),
            Some("features.npy"),
        );

        assert_eq!(plan.spatial_path(), PathBuf::from("/out/features_spatial.npy"));
        assert_eq!(
            plan.metadata_path(),
            PathBuf::from("/out/features_metadata.npz")
        );
        assert_eq!(plan.nrrd_path(1.0), PathBuf::from("/out/run1_mz_1.0000.nrrd"));

        let nested = OutputPlan::new(Path::new("/data/run1.imzML"), None, Some("sub/set"));
        assert_eq!(nested.list_path(), PathBuf::from("/data/sub/set_list.npy"));
    }

    #[test]
    fn test_prepare_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let plan = OutputPlan::new(&dir.path().join("a.imzML"), Some(&dir.path().join("x/y")), None);
        let target = plan.nrrd_path(1.0);

        plan.prepare(&target).unwrap();
        assert!(dir.path().join("x/y").is_dir());
    }
}
