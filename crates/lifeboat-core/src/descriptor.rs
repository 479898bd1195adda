use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::entry::Entry;
use crate::field::Field;

/// Yields `(key, value)` for every line of the form `key<whitespace>value`.
///
/// Comment lines, blank lines and lines without a value are skipped.
pub fn parse_key_values(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once(char::is_whitespace)?;
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some((key, value))
    })
}

pub fn parse_descriptor(path: impl Into<PathBuf>, root: impl Into<PathBuf>, raw: &str) -> Entry {
    let mut entry = Entry::new(path, root);
    for (key, value) in parse_key_values(raw) {
        if let Some(field) = Field::from_key(key) {
            entry.values_mut(field).push(value.to_string());
        }
    }
    entry
}

pub fn read_descriptor(path: &Path, root: &Path) -> Result<Entry> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read boot entry: {}", path.display()))?;
    Ok(parse_descriptor(path, root, &raw))
}

pub fn render_descriptor(entry: &Entry) -> String {
    let mut payload = String::new();
    for field in Field::ALL {
        for value in entry.values(field) {
            payload.push_str(&format!("{}\t{}\n", field.disk_key(), value));
        }
    }
    payload
}
