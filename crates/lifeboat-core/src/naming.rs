use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};

use crate::entry::file_name_of;

const LIFEBOAT_PREFIX: &str = "lifeboat_";
const PRETTY_DATE_FORMAT: &str = "%b %-d, %Y (%H:%M)";
const IMAGE_STASH_DIR: &str = "lifeboat";

pub fn lifeboat_name(name: &str, timestamp: u64) -> String {
    format!("{LIFEBOAT_PREFIX}{timestamp}_{name}")
}

/// The timestamp embedded in a `lifeboat_<timestamp>_<name>` file name.
pub fn parse_lifeboat_timestamp(file_name: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(LIFEBOAT_PREFIX)?;
    let (digits, _) = rest.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub fn lifeboat_descriptor_path(path: &Path, timestamp: u64) -> PathBuf {
    path.with_file_name(lifeboat_name(&file_name_of(path), timestamp))
}

/// Payload values are kept as written in the descriptor, so this works on the string form.
pub fn lifeboat_payload_path(path: &str, timestamp: u64) -> String {
    match path.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/{}", lifeboat_name(name, timestamp)),
        None => lifeboat_name(path, timestamp),
    }
}

/// Copy of a unified kernel image at `<grandparent>/lifeboat/lifeboat_<timestamp>_<name>`.
///
/// The boot loader picks up every image in `/EFI/Linux`, so copies must live outside the image's
/// own directory.
pub fn lifeboat_image_path(path: &str, timestamp: u64) -> String {
    let image = Path::new(path);
    let name = file_name_of(image);
    let base = image.parent().and_then(Path::parent).unwrap_or(Path::new(""));
    base.join(IMAGE_STASH_DIR)
        .join(lifeboat_name(&name, timestamp))
        .to_string_lossy()
        .into_owned()
}

/// Leading `-` sorts below any real version; the trailing timestamp orders lifeboats by age.
pub fn lifeboat_version(version: Option<&str>, timestamp: u64) -> String {
    format!("-{}-{timestamp}", version.unwrap_or_default())
}

pub fn pretty_date(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|seconds| Local.timestamp_opt(seconds, 0).single())
        .map(|moment| moment.format(PRETTY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
