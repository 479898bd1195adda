use std::path::{Path, PathBuf};

/// Paths inside a boot partition (ESP or XBOOTLDR) as seen from the real root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootLayout {
    root: PathBuf,
}

impl BootLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn loader_dir(&self) -> PathBuf {
        self.root.join("loader")
    }

    pub fn entries_dir(&self) -> PathBuf {
        self.loader_dir().join("entries")
    }

    pub fn loader_conf_path(&self) -> PathBuf {
        self.loader_dir().join("loader.conf")
    }

    pub fn entry_path(&self, file_name: &str) -> PathBuf {
        self.entries_dir().join(file_name)
    }
}
