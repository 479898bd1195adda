use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lifeboat_fs::RootContext;

use crate::descriptor::{parse_key_values, read_descriptor};
use crate::entry::Entry;
use crate::error::LifeboatError;
use crate::layout::BootLayout;

/// Something that can list the boot entries of the running system.
pub trait EntrySource {
    fn entries(&self, context: &mut RootContext) -> Result<Vec<Entry>>;

    fn describe(&self) -> String;

    /// Path of the entry the boot loader would pick by default.
    fn default_entry_path(&self, context: &mut RootContext) -> Result<PathBuf> {
        let entries = self.entries(context)?;
        single_default(&entries, &self.describe())
    }
}

pub fn single_default(entries: &[Entry], origin: &str) -> Result<PathBuf> {
    let mut defaults = entries.iter().filter(|entry| entry.is_default);
    match (defaults.next(), defaults.next()) {
        (Some(entry), None) => Ok(entry.path.clone()),
        _ => Err(LifeboatError::configuration(format!(
            "could not determine the default entry from {origin}"
        ))
        .into()),
    }
}

/// Reads type #1 descriptors straight from `<root>/loader/entries`, for systems where `bootctl`
/// is unavailable or the boot partition is mounted somewhere unusual.
#[derive(Debug, Clone)]
pub struct EntriesDirSource {
    layout: BootLayout,
}

impl EntriesDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: BootLayout::new(root),
        }
    }

    fn read_entries(&self) -> Result<Vec<Entry>> {
        let dir = self.layout.entries_dir();
        let mut paths = Vec::new();
        for item in fs::read_dir(&dir)
            .with_context(|| format!("failed to read boot entries directory: {}", dir.display()))?
        {
            let item = item?;
            if !item.file_type()?.is_file() {
                continue;
            }
            let path = item.path();
            if path.extension().and_then(|v| v.to_str()) != Some("conf") {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let default_name = self.configured_default()?;
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let mut entry = read_descriptor(&path, self.layout.root())?;
            entry.is_default = default_name
                .as_deref()
                .is_some_and(|name| names_entry(&path, name));
            entries.push(entry);
        }
        Ok(entries)
    }

    fn configured_default(&self) -> Result<Option<String>> {
        let path = self.layout.loader_conf_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read loader configuration: {}", path.display()))?;
        Ok(parse_key_values(&raw)
            .filter(|(key, _)| *key == "default")
            .last()
            .map(|(_, value)| value.to_string()))
    }
}

impl EntrySource for EntriesDirSource {
    fn entries(&self, context: &mut RootContext) -> Result<Vec<Entry>> {
        context.within("/", |_| self.read_entries())
    }

    fn describe(&self) -> String {
        self.layout.entries_dir().display().to_string()
    }
}

fn names_entry(path: &Path, name: &str) -> bool {
    let file_name = path.file_name().and_then(|v| v.to_str());
    let stem = path.file_stem().and_then(|v| v.to_str());
    file_name == Some(name) || stem == Some(name)
}
