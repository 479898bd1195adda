use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use lifeboat_core::{Entry, EntrySource};
use lifeboat_fs::RootContext;

use crate::entries::parse_bootctl_entries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootPathKind {
    /// `$BOOT`, the XBOOTLDR partition when there is one.
    Boot,
    Esp,
}

impl BootPathKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Esp => "esp",
        }
    }
}

/// Lists boot entries by asking `bootctl`. Always run from the real root.
#[derive(Debug, Clone)]
pub struct BootctlSource {
    program: PathBuf,
}

impl Default for BootctlSource {
    fn default() -> Self {
        Self {
            program: PathBuf::from("bootctl"),
        }
    }
}

impl BootctlSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn print_path(&self, context: &mut RootContext, kind: BootPathKind) -> Result<PathBuf> {
        let flag = format!("--print-{}-path", kind.as_str());
        let output = self.run(context, &[&flag])?;
        Ok(PathBuf::from(output))
    }

    fn run(&self, context: &mut RootContext, args: &[&str]) -> Result<String> {
        context.within("/", |_| {
            let output = Command::new(&self.program)
                .arg("--no-pager")
                .args(args)
                .output()
                .with_context(|| {
                    format!(
                        "failed launching {} {}",
                        self.program.display(),
                        args.join(" ")
                    )
                })?;
            if !output.status.success() {
                anyhow::bail!(
                    "{} {} failed: {}",
                    self.program.display(),
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        })
    }
}

impl EntrySource for BootctlSource {
    fn entries(&self, context: &mut RootContext) -> Result<Vec<Entry>> {
        let raw = self.run(context, &["--json=short", "list"])?;
        parse_bootctl_entries(&raw)
    }

    fn describe(&self) -> String {
        format!("`{} list`", self.program.display())
    }
}
