use std::collections::BTreeSet;
use std::path::Path;

use lifeboat_fs::{sha256_file_hex, RootContext, RootContextError};
use tracing::warn;

use crate::entry::Entry;
use crate::field::{Comparison, Field};

/// True when `left` and `right` boot the same thing.
///
/// Payload fields compare by the set of digests of the files they name, each resolved inside its
/// own entry's root. An unreadable payload makes the entries different; only a failure to switch
/// roots is returned as an error.
pub fn equivalent(
    context: &mut RootContext,
    left: &Entry,
    right: &Entry,
) -> Result<bool, RootContextError> {
    let literal_match = Field::ALL
        .into_iter()
        .filter(|field| field.comparison() == Comparison::Literal)
        .all(|field| left.values(field) == right.values(field));
    if !literal_match {
        return Ok(false);
    }

    for field in Field::ALL
        .into_iter()
        .filter(|field| field.comparison() == Comparison::DigestSet)
    {
        let Some(left_digests) = payload_digests(context, left, field)? else {
            return Ok(false);
        };
        let Some(right_digests) = payload_digests(context, right, field)? else {
            return Ok(false);
        };
        if left_digests != right_digests {
            return Ok(false);
        }
    }
    Ok(true)
}

fn payload_digests(
    context: &mut RootContext,
    entry: &Entry,
    field: Field,
) -> Result<Option<BTreeSet<String>>, RootContextError> {
    if entry.values(field).is_empty() {
        return Ok(Some(BTreeSet::new()));
    }

    let scope = context.enter(&entry.root)?;
    let digests = entry
        .values(field)
        .iter()
        .map(|path| sha256_file_hex(Path::new(path)))
        .collect::<Result<BTreeSet<_>, _>>();
    scope.leave()?;

    match digests {
        Ok(digests) => Ok(Some(digests)),
        Err(err) => {
            warn!(
                "{err}: {} cannot be considered equivalent because this file is missing",
                entry.basename()
            );
            Ok(None)
        }
    }
}
