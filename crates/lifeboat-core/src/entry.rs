use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::field::Field;
use crate::naming::parse_lifeboat_timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryKind {
    /// A type #1 `.conf` descriptor.
    #[default]
    Descriptor,
    /// A type #2 unified kernel image; `path` is the EFI binary itself.
    UnifiedImage,
}

/// One boot loader entry.
///
/// `path` is always in the real root's namespace, while payload values (`linux`, `initrd`, `efi`)
/// are resolved against `root`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub root: PathBuf,
    pub kind: EntryKind,
    pub autosave: bool,
    pub is_default: bool,
    pub title: Vec<String>,
    pub version: Vec<String>,
    pub machine_id: Vec<String>,
    pub sort_key: Vec<String>,
    pub linux: Vec<String>,
    pub initrd: Vec<String>,
    pub efi: Vec<String>,
    pub options: Vec<String>,
    pub devicetree: Vec<String>,
    pub devicetree_overlay: Vec<String>,
    pub architecture: Vec<String>,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn values(&self, field: Field) -> &[String] {
        match field {
            Field::Title => &self.title,
            Field::Version => &self.version,
            Field::MachineId => &self.machine_id,
            Field::SortKey => &self.sort_key,
            Field::Linux => &self.linux,
            Field::Initrd => &self.initrd,
            Field::Efi => &self.efi,
            Field::Options => &self.options,
            Field::Devicetree => &self.devicetree,
            Field::DevicetreeOverlay => &self.devicetree_overlay,
            Field::Architecture => &self.architecture,
        }
    }

    pub fn values_mut(&mut self, field: Field) -> &mut Vec<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Version => &mut self.version,
            Field::MachineId => &mut self.machine_id,
            Field::SortKey => &mut self.sort_key,
            Field::Linux => &mut self.linux,
            Field::Initrd => &mut self.initrd,
            Field::Efi => &mut self.efi,
            Field::Options => &mut self.options,
            Field::Devicetree => &mut self.devicetree,
            Field::DevicetreeOverlay => &mut self.devicetree_overlay,
            Field::Architecture => &mut self.architecture,
        }
    }

    pub fn with_values<I, S>(mut self, field: Field, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.values_mut(field) = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn first(&self, field: Field) -> Option<&str> {
        self.values(field).first().map(String::as_str)
    }

    pub fn basename(&self) -> String {
        file_name_of(&self.path)
    }

    pub fn timestamp(&self) -> Option<u64> {
        parse_lifeboat_timestamp(&self.basename())
    }

    pub fn is_lifeboat(&self) -> bool {
        self.timestamp().is_some()
    }
}

/// Orders lifeboats newest first, breaking timestamp ties by descending path.
pub fn newest_first(left: &Entry, right: &Entry) -> Ordering {
    right
        .timestamp()
        .cmp(&left.timestamp())
        .then_with(|| right.path.cmp(&left.path))
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
