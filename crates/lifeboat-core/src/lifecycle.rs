use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lifeboat_fs::{FileOps, FileTransaction, RootContext, RootContextError};
use tracing::info;

use crate::descriptor::render_descriptor;
use crate::entry::{Entry, EntryKind};
use crate::error::LifeboatError;
use crate::field::Field;
use crate::layout::BootLayout;
use crate::naming::{
    lifeboat_descriptor_path, lifeboat_image_path, lifeboat_name, lifeboat_payload_path,
    lifeboat_version, pretty_date,
};

/// Copies `entry` and all of its payload files into a new lifeboat stamped with `timestamp`.
///
/// Payloads are copied next to their originals inside `entry.root`, except unified kernel images,
/// which go to a `lifeboat` directory the boot loader does not scan. The descriptor is written
/// last, from the real root, and never replaces an existing file. Any failure removes every file
/// this call created.
pub fn create_lifeboat(
    context: &mut RootContext,
    ops: &FileOps,
    entry: &Entry,
    timestamp: u64,
) -> Result<Entry> {
    FileTransaction::run(context, ops, |context, transaction| {
        let mut lifeboat = entry.clone();

        let scope = context.enter(&entry.root)?;
        for field in Field::PAYLOAD {
            let mut copies = Vec::with_capacity(entry.values(field).len());
            for source in entry.values(field) {
                let destination = payload_destination(ops, entry.kind, source, timestamp)?;
                ops.copy_file(Path::new(source), Path::new(&destination))
                    .map_err(LifeboatError::from)?;
                transaction.track(&scope, &destination);
                copies.push(destination);
            }
            *lifeboat.values_mut(field) = copies;
        }
        scope.leave()?;

        let title = entry
            .first(Field::Title)
            .map(str::to_string)
            .unwrap_or_else(|| entry.basename());
        lifeboat.path = lifeboat_path(entry, timestamp);
        lifeboat.kind = EntryKind::Descriptor;
        lifeboat.autosave = false;
        lifeboat.is_default = false;
        lifeboat.title = vec![format!("{title} @{}", pretty_date(timestamp))];
        lifeboat.version = vec![lifeboat_version(entry.first(Field::Version), timestamp)];

        context.within("/", |context| {
            save_entry(context, ops, &lifeboat)?;
            transaction.track(context, &lifeboat.path);
            Ok(())
        })?;
        Ok(lifeboat)
    })
    .with_context(|| format!("could not create a lifeboat of {}", entry.basename()))
}

fn payload_destination(
    ops: &FileOps,
    kind: EntryKind,
    source: &str,
    timestamp: u64,
) -> Result<String> {
    match kind {
        EntryKind::Descriptor => Ok(lifeboat_payload_path(source, timestamp)),
        EntryKind::UnifiedImage => {
            let destination = lifeboat_image_path(source, timestamp);
            if let Some(stash) = Path::new(&destination).parent() {
                ops.create_dir_all(stash).map_err(LifeboatError::from)?;
            }
            Ok(destination)
        }
    }
}

fn lifeboat_path(entry: &Entry, timestamp: u64) -> PathBuf {
    match entry.kind {
        EntryKind::Descriptor => lifeboat_descriptor_path(&entry.path, timestamp),
        EntryKind::UnifiedImage => {
            let stem = entry
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.basename());
            let name = lifeboat_name(&format!("{stem}.conf"), timestamp);
            BootLayout::new(&entry.root).entry_path(&name)
        }
    }
}

/// Deletes the payloads of `entry` and then its descriptor. Individual deletion failures are
/// logged and skipped.
pub fn remove_entry(
    context: &mut RootContext,
    ops: &FileOps,
    entry: &Entry,
) -> Result<(), RootContextError> {
    for field in Field::PAYLOAD {
        for file in entry.values(field) {
            ops.delete_file(context, &entry.root, Path::new(file))?;
        }
    }
    ops.delete_file(context, Path::new("/"), &entry.path)
}

/// Writes the descriptor of `entry` from the real root. Autosaved entries replace the existing
/// file; anything else must not exist yet.
pub fn save_entry(context: &mut RootContext, ops: &FileOps, entry: &Entry) -> Result<()> {
    if entry.kind == EntryKind::UnifiedImage {
        bail!(
            "refusing to write a descriptor over unified kernel image {}",
            entry.path.display()
        );
    }

    let contents = render_descriptor(entry);
    context
        .within("/", |_| {
            let written = if entry.autosave {
                ops.overwrite(&entry.path, &contents)
            } else {
                ops.write_new(&entry.path, &contents)
            };
            written.map_err(LifeboatError::from)?;
            Ok(())
        })
        .with_context(|| format!("could not save boot entry {}", entry.basename()))?;

    let title = entry
        .first(Field::Title)
        .map(str::to_string)
        .unwrap_or_else(|| entry.basename());
    info!("Saved boot entry {title} with contents:\n{contents}");
    Ok(())
}
