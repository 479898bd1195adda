use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use lifeboat_core::{Entry, EntryKind, Field};
use serde_json::{Map, Value};
use tracing::debug;

const UNIFIED_IMAGE_TYPE: &str = "type2";

/// Converts the output of `bootctl --json=short list` into entries.
///
/// Entries bootctl could not place on a partition (no `root`) are skipped.
pub fn parse_bootctl_entries(raw: &str) -> Result<Vec<Entry>> {
    let value: Value = serde_json::from_str(raw.trim())
        .context("failed to parse bootctl entry list as JSON")?;
    let Value::Array(items) = value else {
        bail!("bootctl entry list is not a JSON array");
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(object) = item else {
            bail!("bootctl entry #{index} is not a JSON object");
        };
        if let Some(entry) = parse_entry(object)
            .with_context(|| format!("failed to read bootctl entry #{index}"))?
        {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn parse_entry(object: &Map<String, Value>) -> Result<Option<Entry>> {
    let mut path = None;
    let mut root = None;
    let mut entry = Entry::default();

    for (key, value) in object {
        match snake_case(key).as_str() {
            "path" => path = first_string(value),
            "root" => root = first_string(value),
            "is_default" => entry.is_default = value.as_bool().unwrap_or(false),
            "type" => {
                if value.as_str() == Some(UNIFIED_IMAGE_TYPE) {
                    entry.kind = EntryKind::UnifiedImage;
                }
            }
            other => {
                if let Some(field) = Field::from_key(other) {
                    *entry.values_mut(field) = strings(value);
                }
            }
        }
    }

    let Some(root) = root else {
        debug!(id = ?object.get("id"), "skipping bootctl entry without a root");
        return Ok(None);
    };
    let Some(path) = path else {
        bail!("entry has a root but no path");
    };
    entry.path = PathBuf::from(path);
    entry.root = PathBuf::from(root);
    Ok(Some(entry))
}

/// `sortKey` becomes `sort_key`.
pub fn snake_case(key: &str) -> String {
    let mut snake = String::with_capacity(key.len() + 4);
    let mut previous_lower = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() && previous_lower {
            snake.push('_');
        }
        previous_lower = ch.is_ascii_lowercase();
        snake.push(ch.to_ascii_lowercase());
    }
    snake
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    }
}

fn strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
