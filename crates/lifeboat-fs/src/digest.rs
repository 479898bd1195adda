use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("could not compute the digest of {}", path.display())]
pub struct DigestError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl DigestError {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn sha256_file_hex(path: &Path) -> Result<String, DigestError> {
    let to_error = |source| DigestError {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(to_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(to_error)?;
    Ok(hex::encode(hasher.finalize()))
}
