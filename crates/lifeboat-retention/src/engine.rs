use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::Result;
use lifeboat_core::{
    compare_versions, create_lifeboat, equivalent, newest_first, remove_entry, save_entry,
    single_default, Entry, EntryKind, EntrySource, Field, LifeboatError,
};
use lifeboat_fs::{FileOps, RootContext};
use tracing::{debug, info, warn};

use crate::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_lifeboats: usize,
    pub default_sort_key: String,
    pub default_version: String,
    /// Overrides whatever entry the source reports as default.
    pub default_entry_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionOutcome {
    AlreadyBackedUp {
        entry: PathBuf,
        lifeboat: PathBuf,
    },
    Created {
        entry: PathBuf,
        lifeboat: Entry,
        evicted: Vec<PathBuf>,
    },
}

/// Keeps up to `max_lifeboats` copies of the default boot entry, adding one whenever the entry's
/// content no longer matches any existing copy.
pub struct RetentionEngine<'a> {
    source: &'a dyn EntrySource,
    clock: &'a dyn Clock,
    ops: FileOps,
}

impl<'a> RetentionEngine<'a> {
    pub fn new(source: &'a dyn EntrySource, clock: &'a dyn Clock, ops: FileOps) -> Self {
        Self { source, clock, ops }
    }

    pub fn run(
        &self,
        context: &mut RootContext,
        policy: &RetentionPolicy,
    ) -> Result<RetentionOutcome> {
        if policy.max_lifeboats < 1 {
            return Err(LifeboatError::configuration(format!(
                "max_lifeboats {} must be at least 1",
                policy.max_lifeboats
            ))
            .into());
        }

        let entries = self.source.entries(context)?;
        let live = self.resolve_default(&entries, policy)?;
        let live = self.apply_defaults(context, live, policy)?;

        let mut lifeboats = entries
            .into_iter()
            .filter(is_managed_lifeboat)
            .collect::<Vec<_>>();
        lifeboats.sort_by(newest_first);

        for lifeboat in &lifeboats {
            if equivalent(context, lifeboat, &live)? {
                info!(
                    "{} is already backed up to {}, nothing to do",
                    live.basename(),
                    lifeboat.basename()
                );
                return Ok(RetentionOutcome::AlreadyBackedUp {
                    entry: live.path.clone(),
                    lifeboat: lifeboat.path.clone(),
                });
            }
        }

        let mut evicted = Vec::new();
        while lifeboats.len() >= policy.max_lifeboats {
            let Some(oldest) = lifeboats.pop() else {
                break;
            };
            info!("Deleting old lifeboat {}", oldest.basename());
            remove_entry(context, &self.ops, &oldest)?;
            evicted.push(oldest.path);
        }

        let timestamp = self.clock.now_unix_sec();
        let lifeboat = create_lifeboat(context, &self.ops, &live, timestamp)?;
        check_version_order(&lifeboat, &live);

        Ok(RetentionOutcome::Created {
            entry: live.path,
            lifeboat,
            evicted,
        })
    }

    fn resolve_default(&self, entries: &[Entry], policy: &RetentionPolicy) -> Result<Entry> {
        let path = match &policy.default_entry_path {
            Some(path) => path.clone(),
            None => single_default(entries, &self.source.describe())?,
        };
        let Some(live) = entries.iter().find(|entry| entry.path == path) else {
            return Err(LifeboatError::configuration(format!(
                "could not find {} in {}",
                path.display(),
                self.source.describe()
            ))
            .into());
        };

        info!("using {} as the default entry", live.path.display());
        if live.is_lifeboat() {
            return Err(LifeboatError::configuration(format!(
                "{} is a lifeboat and cannot be used as the default entry",
                live.basename()
            ))
            .into());
        }
        Ok(live.clone())
    }

    fn apply_defaults(
        &self,
        context: &mut RootContext,
        mut live: Entry,
        policy: &RetentionPolicy,
    ) -> Result<Entry> {
        let mut filled = false;
        if live.sort_key.is_empty() {
            live.sort_key = vec![policy.default_sort_key.clone()];
            filled = true;
        }
        if live.version.is_empty() {
            live.version = vec![policy.default_version.clone()];
            filled = true;
        }
        if !filled {
            return Ok(live);
        }

        match live.kind {
            EntryKind::Descriptor => {
                live.autosave = true;
                save_entry(context, &self.ops, &live)?;
            }
            EntryKind::UnifiedImage => {
                debug!(
                    "{} is a unified kernel image, defaults stay in memory",
                    live.basename()
                );
            }
        }
        Ok(live)
    }
}

/// Lifeboats are always written as descriptors. A unified image carrying the lifeboat prefix is
/// a payload of one of them, never a lifeboat in its own right.
fn is_managed_lifeboat(entry: &Entry) -> bool {
    entry.kind == EntryKind::Descriptor && entry.is_lifeboat()
}

fn check_version_order(lifeboat: &Entry, live: &Entry) {
    let (Some(new), Some(current)) = (lifeboat.first(Field::Version), live.first(Field::Version))
    else {
        return;
    };
    if compare_versions(new, current) != Ordering::Less {
        warn!(
            "lifeboat version {new} does not sort below {current}, the boot loader may prefer {}",
            lifeboat.basename()
        );
    }
}
