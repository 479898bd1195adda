use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{error, warn};

use crate::file_ops::FileOps;
use crate::root_context::{is_root_context_error, RootContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub root: PathBuf,
    pub path: PathBuf,
}

/// Files created by one compound operation, removed again if that operation fails.
#[derive(Debug, Default)]
pub struct FileTransaction {
    files: Vec<TrackedFile>,
}

impl FileTransaction {
    /// Runs `run` as one all-or-nothing unit.
    ///
    /// `Ok` commits by leaving every tracked file in place. Any other outcome deletes the tracked
    /// files newest first and returns the original error, unless the error came from switching
    /// roots: then the effective root is unknown and nothing is touched.
    pub fn run<T, F>(context: &mut RootContext, ops: &FileOps, run: F) -> Result<T>
    where
        F: FnOnce(&mut RootContext, &mut FileTransaction) -> Result<T>,
    {
        let mut transaction = FileTransaction::default();
        match run(context, &mut transaction) {
            Ok(value) => Ok(value),
            Err(err) => {
                if is_root_context_error(&err) {
                    warn!(
                        "skipping rollback of {} file(s), root state is unverified",
                        transaction.files.len()
                    );
                } else {
                    transaction.roll_back(context, ops);
                }
                Err(err)
            }
        }
    }

    /// Records `path` against whichever root is active right now.
    pub fn track(&mut self, context: &RootContext, path: impl AsRef<Path>) {
        self.files.push(TrackedFile {
            root: context.current_root().to_path_buf(),
            path: path.as_ref().to_path_buf(),
        });
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> &[TrackedFile] {
        &self.files
    }

    fn roll_back(self, context: &mut RootContext, ops: &FileOps) {
        for file in self.files.iter().rev() {
            if let Err(err) = ops.delete_file(context, &file.root, &file.path) {
                error!("abandoning rollback: {err}");
                break;
            }
        }
    }
}
