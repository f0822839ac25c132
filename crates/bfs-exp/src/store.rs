use std::fs;
use std::path::{Path, PathBuf};

use bfs_core::errors::SweepError;

use crate::sampler::format_value;

/// Filesystem ledger of exported field artifacts.
///
/// An artifact's existence is the only durable record that a sample is
/// done; nothing else is consulted when deciding whether to skip work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    /// Opens a store rooted at `root`. Nothing is created until
    /// [`ResultStore::ensure_folder`] is called.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root folder holding one subfolder per variable.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-variable subfolder.
    pub fn folder_for(&self, variable: &str) -> PathBuf {
        self.root.join(variable)
    }

    /// Canonical artifact path for `(variable, value)`.
    pub fn path_for(&self, variable: &str, value: f64) -> PathBuf {
        path_for(&self.root, variable, value)
    }

    /// Whether an artifact already exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Creates the per-variable subfolder if it is absent.
    pub fn ensure_folder(&self, variable: &str) -> Result<PathBuf, SweepError> {
        let folder = self.folder_for(variable);
        fs::create_dir_all(&folder)
            .map_err(|err| SweepError::io("store-create-folder", &folder, err))?;
        Ok(folder)
    }

    /// Counts how many of `values` already have an artifact.
    pub fn completed(&self, variable: &str, values: &[f64]) -> usize {
        values
            .iter()
            .filter(|value| self.exists(&self.path_for(variable, **value)))
            .count()
    }
}

/// `<root>/<variable>/BField_<variable>_<value>.txt`
pub fn path_for(root: &Path, variable: &str, value: f64) -> PathBuf {
    root.join(variable).join(file_name(variable, value))
}

/// Artifact file name for `(variable, value)`.
pub fn file_name(variable: &str, value: f64) -> String {
    format!("BField_{}_{}.txt", variable, format_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_decimal_rendering() {
        assert_eq!(file_name("Coil_11", 150.0), "BField_Coil_11_150.0.txt");
        assert_eq!(file_name("A", 93.125), "BField_A_93.125.txt");
    }

    #[test]
    fn path_nests_under_variable_folder() {
        let path = path_for(Path::new("results"), "A", 1.5);
        assert_eq!(path, Path::new("results").join("A").join("BField_A_1.5.txt"));
    }
}
