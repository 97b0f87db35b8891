use thiserror::Error;

/// Failures reported by a GPU backend.
///
/// Creation failures are fatal for the object being built: constructors
/// release whatever they had already acquired before returning the error.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("out of GPU memory while creating {what}")]
    OutOfMemory { what: &'static str },

    #[error("program `{label}` failed to build: {reason}")]
    ProgramLink { label: &'static str, reason: String },

    #[error("{what} handle is not known to this backend")]
    InvalidHandle { what: &'static str },

    #[error("invalid GPU usage: {0}")]
    Validation(String),

    #[error("no render target is available")]
    NoTarget,
}

impl GpuError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        GpuError::Validation(msg.into())
    }
}
