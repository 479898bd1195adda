use lifeboat_fs::FileOpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifeboatError {
    /// Bad limit, unresolvable default entry, or a default entry that is itself a lifeboat.
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    FileOperation(#[from] FileOpError),
}

impl LifeboatError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub fn is_lifeboat_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<LifeboatError>())
}

pub fn is_configuration_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<LifeboatError>(),
            Some(LifeboatError::Configuration(_))
        )
    })
}
