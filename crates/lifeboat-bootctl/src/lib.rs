mod command;
mod entries;

pub use command::{BootPathKind, BootctlSource};
pub use entries::{parse_bootctl_entries, snake_case};
