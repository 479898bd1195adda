mod digest;
mod file_ops;
mod root_context;
mod transaction;

pub use digest::{sha256_file_hex, DigestError};
pub use file_ops::{FileOpError, FileOps};
pub use root_context::{is_root_context_error, RootContext, RootContextError, RootGuard};
pub use transaction::{FileTransaction, TrackedFile};
