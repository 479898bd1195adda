use std::path::PathBuf;

use anyhow::{Context, Result};
use lifeboat_bootctl::{BootPathKind, BootctlSource};
use lifeboat_core::{is_lifeboat_error, EntriesDirSource, EntrySource};
use lifeboat_fs::{is_root_context_error, FileOps, RootContext};
use lifeboat_retention::{RetentionEngine, RetentionPolicy, SystemClock};
use tracing::info;

use crate::render::{format_outcome_lines, TerminalRenderer};
use crate::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// Reported with its message only.
    Domain,
    /// Reported with the full cause chain.
    Unexpected,
}

pub(crate) fn classify_failure(err: &anyhow::Error) -> FailureKind {
    if is_lifeboat_error(err) || is_root_context_error(err) {
        FailureKind::Domain
    } else {
        FailureKind::Unexpected
    }
}

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let ops = FileOps::new(cli.dry_run);
    if ops.is_dry_run() {
        info!("Setting dry run mode on");
    }

    let policy = RetentionPolicy {
        max_lifeboats: cli.max_lifeboats,
        default_sort_key: cli.default_sort_key,
        default_version: match cli.default_version {
            Some(version) => version,
            None => running_kernel_release()?,
        },
        default_entry_path: cli.default_config_path,
    };

    let mut context = RootContext::new();
    let bootctl = BootctlSource::new();
    let offline;
    let source: &dyn EntrySource = match cli.boot_root {
        None => &bootctl,
        Some(boot_root) => {
            let root = resolve_boot_root(&bootctl, &mut context, boot_root)?;
            offline = EntriesDirSource::new(root);
            &offline
        }
    };

    let clock = SystemClock;
    let outcome = RetentionEngine::new(source, &clock, ops).run(&mut context, &policy)?;

    let renderer = TerminalRenderer::current();
    for (status, line) in format_outcome_lines(&outcome, ops.is_dry_run()) {
        renderer.print_status(status, &line);
    }
    Ok(())
}

fn resolve_boot_root(
    bootctl: &BootctlSource,
    context: &mut RootContext,
    boot_root: Option<PathBuf>,
) -> Result<PathBuf> {
    match boot_root {
        Some(root) => Ok(root),
        None => bootctl
            .print_path(context, BootPathKind::Boot)
            .context("could not locate the boot partition"),
    }
}

pub(crate) fn running_kernel_release() -> Result<String> {
    let uts = nix::sys::utsname::uname().context("failed to query the running kernel release")?;
    Ok(uts.release().to_string_lossy().into_owned())
}
