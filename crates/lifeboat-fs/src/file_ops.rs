use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::root_context::{RootContext, RootContextError};

#[derive(Debug, Error)]
pub enum FileOpError {
    #[error("copying {} failed because it doesn't exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("refusing to overwrite {} because it already exists", .0.display())]
    DestinationExists(PathBuf),
    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// The mutating file primitives. With `dry_run` set every precondition is still checked and
/// every action is still logged, but no bytes are written or removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOps {
    dry_run: bool,
}

impl FileOps {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copies `source` to a new file at `destination`, carrying over permissions, modification
    /// time, owner and group. Never replaces an existing destination.
    pub fn copy_file(&self, source: &Path, destination: &Path) -> Result<(), FileOpError> {
        if !source.exists() {
            return Err(FileOpError::SourceMissing(source.to_path_buf()));
        }
        info!("Copying {} to {}", source.display(), destination.display());
        if path_taken(destination) {
            return Err(FileOpError::DestinationExists(destination.to_path_buf()));
        }

        if self.dry_run {
            info!(
                "--dry-run prevents copying {} to {}",
                source.display(),
                destination.display()
            );
            return Ok(());
        }

        let mut writer = create_new(destination)?;
        let copied = copy_contents(source, destination, &mut writer);
        drop(writer);
        if copied.is_err() {
            if let Err(err) = fs::remove_file(destination) {
                warn!(
                    "could not remove partial copy {}: {err}",
                    destination.display()
                );
            }
        }
        copied
    }

    pub fn write_new(&self, path: &Path, contents: &str) -> Result<(), FileOpError> {
        if path_taken(path) {
            return Err(FileOpError::DestinationExists(path.to_path_buf()));
        }
        if self.dry_run {
            info!("--dry-run prevents writing to {}", path.display());
            return Ok(());
        }

        let mut file = create_new(path)?;
        file.write_all(contents.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|err| FileOpError::io("write", path, err))
    }

    /// Creates `dir` and any missing parents. Existing directories are left alone.
    pub fn create_dir_all(&self, dir: &Path) -> Result<(), FileOpError> {
        if dir.is_dir() {
            return Ok(());
        }
        if self.dry_run {
            info!("--dry-run prevents creating directory {}", dir.display());
            return Ok(());
        }
        info!("Creating directory {}", dir.display());
        fs::create_dir_all(dir).map_err(|err| FileOpError::io("create directory", dir, err))
    }

    pub fn overwrite(&self, path: &Path, contents: &str) -> Result<(), FileOpError> {
        if self.dry_run {
            info!("--dry-run prevents writing to {}", path.display());
            return Ok(());
        }
        fs::write(path, contents.as_bytes()).map_err(|err| FileOpError::io("write", path, err))
    }

    /// Removes `path` as seen from `root`. Removal failures are logged and swallowed; only a
    /// failure to switch roots is returned.
    pub fn delete_file(
        &self,
        context: &mut RootContext,
        root: &Path,
        path: &Path,
    ) -> Result<(), RootContextError> {
        if path.as_os_str().is_empty() {
            warn!("Refusing to delete empty file at {}", root.display());
            return Ok(());
        }

        let scope = context.enter(root)?;
        if self.dry_run {
            info!(
                "--dry-run prevents deleting {}:{}",
                root.display(),
                path.display()
            );
        } else {
            match fs::remove_file(path) {
                Ok(()) => info!("Removed {}:{}", root.display(), path.display()),
                Err(err) => warn!(
                    "Error {err} removing {}:{}, continuing",
                    root.display(),
                    path.display()
                ),
            }
        }
        scope.leave()
    }
}

fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn create_new(path: &Path) -> Result<File, FileOpError> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(FileOpError::DestinationExists(path.to_path_buf()))
        }
        Err(err) => Err(FileOpError::io("create", path, err)),
    }
}

fn copy_contents(source: &Path, destination: &Path, writer: &mut File) -> Result<(), FileOpError> {
    let metadata = fs::metadata(source).map_err(|err| FileOpError::io("stat", source, err))?;
    let mut reader = File::open(source).map_err(|err| FileOpError::io("open", source, err))?;
    io::copy(&mut reader, writer).map_err(|err| FileOpError::io("copy into", destination, err))?;

    writer
        .set_permissions(metadata.permissions())
        .map_err(|err| FileOpError::io("set permissions on", destination, err))?;
    let modified = metadata
        .modified()
        .map_err(|err| FileOpError::io("read modification time of", source, err))?;
    writer
        .set_modified(modified)
        .map_err(|err| FileOpError::io("set modification time on", destination, err))?;
    writer
        .sync_all()
        .map_err(|err| FileOpError::io("sync", destination, err))?;

    std::os::unix::fs::chown(destination, Some(metadata.uid()), Some(metadata.gid()))
        .map_err(|err| FileOpError::io("change ownership of", destination, err))
}
