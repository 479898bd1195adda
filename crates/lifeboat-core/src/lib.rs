mod descriptor;
mod entry;
mod equivalence;
mod error;
mod field;
mod layout;
mod lifecycle;
mod naming;
mod source;
mod version;

pub use descriptor::{parse_descriptor, parse_key_values, read_descriptor, render_descriptor};
pub use entry::{newest_first, Entry, EntryKind};
pub use equivalence::equivalent;
pub use error::{is_configuration_error, is_lifeboat_error, LifeboatError};
pub use field::{Comparison, Field};
pub use layout::BootLayout;
pub use lifecycle::{create_lifeboat, remove_entry, save_entry};
pub use naming::{
    lifeboat_descriptor_path, lifeboat_image_path, lifeboat_name, lifeboat_payload_path,
    lifeboat_version, parse_lifeboat_timestamp, pretty_date,
};
pub use source::{single_default, EntriesDirSource, EntrySource};
pub use version::compare_versions;

#[cfg(test)]
mod tests;
