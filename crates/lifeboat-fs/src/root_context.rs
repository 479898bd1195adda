use std::fs::File;
use std::io;
use std::ops::{Deref, DerefMut};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, warn};

const REAL_ROOT: &str = "/";

#[derive(Debug, Error)]
#[error("could not {action} {}", path.display())]
pub struct RootContextError {
    path: PathBuf,
    action: &'static str,
    #[source]
    source: io::Error,
}

impl RootContextError {
    pub(crate) fn new(path: &Path, action: &'static str, source: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            action,
            source,
        }
    }

    fn poisoned(path: &Path) -> Self {
        Self::new(
            path,
            "enter root (context poisoned by an earlier failure)",
            io::Error::other("root state is indeterminate"),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// True when any cause in the chain is a [`RootContextError`].
pub fn is_root_context_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<RootContextError>())
}

#[derive(Debug)]
struct ActiveRoot {
    path: PathBuf,
    handle: File,
}

/// Stack of chroot switches made by this process.
///
/// The bottom entry, once anything has been entered, is a retained handle to the real process
/// root. Every other entry is a root that was switched into; only the top one is in effect.
/// Switching between two unrelated roots always goes back through the real root first, since a
/// chroot cannot reach paths outside the view it was made from.
#[derive(Debug, Default)]
pub struct RootContext {
    stack: Vec<ActiveRoot>,
    poisoned: bool,
}

impl RootContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_root(&self) -> &Path {
        self.stack
            .last()
            .map(|active| active.path.as_path())
            .unwrap_or_else(|| Path::new(REAL_ROOT))
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn enter(&mut self, root: impl AsRef<Path>) -> Result<RootGuard<'_>, RootContextError> {
        let root = root.as_ref();
        if self.poisoned {
            return Err(RootContextError::poisoned(root));
        }

        let already_active = match self.stack.last() {
            Some(active) => active.path == root,
            None => root == Path::new(REAL_ROOT),
        };
        if already_active {
            return Ok(RootGuard {
                context: self,
                entered: false,
            });
        }

        if let Err(err) = self.switch_to(root) {
            self.poisoned = true;
            return Err(err);
        }
        debug!(root = %root.display(), depth = self.stack.len(), "entered root");
        Ok(RootGuard {
            context: self,
            entered: true,
        })
    }

    /// Runs `run` with `root` as the effective root and restores the previous root afterwards.
    ///
    /// A [`RootContextError`] coming out of `run` poisons the context, so the restore step only
    /// drops handles and makes no further namespace changes.
    pub fn within<T, F>(&mut self, root: impl AsRef<Path>, run: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut RootContext) -> anyhow::Result<T>,
    {
        let mut guard = self.enter(root)?;
        let result = run(&mut *guard);
        if let Err(err) = &result {
            if is_root_context_error(err) {
                guard.poisoned = true;
            }
        }

        let left = guard.leave();
        match (result, left) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(leave_err)) => {
                warn!("{leave_err} while unwinding from: {err:#}");
                Err(err)
            }
        }
    }

    fn switch_to(&mut self, root: &Path) -> Result<(), RootContextError> {
        if self.stack.is_empty() {
            let handle = open_dir(Path::new(REAL_ROOT))?;
            self.stack.push(ActiveRoot {
                path: PathBuf::from(REAL_ROOT),
                handle,
            });
        }

        if self.stack.len() > 1 {
            restrict_to(&self.stack[0])?;
        }

        let target = ActiveRoot {
            path: root.to_path_buf(),
            handle: open_dir(root)?,
        };
        restrict_to(&target)?;
        self.stack.push(target);
        Ok(())
    }

    fn leave_top(&mut self) -> Result<(), RootContextError> {
        let Some(left) = self.stack.pop() else {
            return Ok(());
        };

        if self.poisoned {
            debug!(root = %left.path.display(), "dropping root without restoring, context poisoned");
            if self.stack.len() == 1 {
                self.stack.clear();
            }
            return Ok(());
        }

        if let Some(previous) = self.stack.last() {
            if let Err(err) = restrict_to(previous) {
                self.poisoned = true;
                return Err(err);
            }
        }
        drop(left);

        if self.stack.len() == 1 {
            self.stack.clear();
        }
        debug!(depth = self.stack.len(), "left root");
        Ok(())
    }
}

/// Scope of one [`RootContext::enter`]; leaving the scope restores the previous root.
pub struct RootGuard<'a> {
    context: &'a mut RootContext,
    entered: bool,
}

impl RootGuard<'_> {
    pub fn leave(mut self) -> Result<(), RootContextError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), RootContextError> {
        if !std::mem::take(&mut self.entered) {
            return Ok(());
        }
        self.context.leave_top()
    }
}

impl Deref for RootGuard<'_> {
    type Target = RootContext;

    fn deref(&self) -> &RootContext {
        self.context
    }
}

impl DerefMut for RootGuard<'_> {
    fn deref_mut(&mut self) -> &mut RootContext {
        self.context
    }
}

impl Drop for RootGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("{err}");
        }
    }
}

fn open_dir(path: &Path) -> Result<File, RootContextError> {
    File::open(path).map_err(|err| RootContextError::new(path, "open root", err))
}

fn restrict_to(active: &ActiveRoot) -> Result<(), RootContextError> {
    nix::unistd::fchdir(active.handle.as_raw_fd())
        .map_err(|errno| RootContextError::new(&active.path, "change directory to", errno.into()))?;
    std::os::unix::fs::chroot(".")
        .map_err(|err| RootContextError::new(&active.path, "chroot into", err))?;
    std::env::set_current_dir(REAL_ROOT)
        .map_err(|err| RootContextError::new(&active.path, "reset working directory in", err))
}
