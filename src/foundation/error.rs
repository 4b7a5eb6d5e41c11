/// Convenience result type used across gapenc.
pub type GapResult<T> = Result<T, GapError>;

/// Top-level error taxonomy used by library APIs.
#[derive(thiserror::Error, Debug)]
pub enum GapError {
    /// Invalid user-provided parameters or frame ranges.
    #[error("validation error: {0}")]
    Validation(String),

    /// File open/read/write failures.
    #[error("io error: {0}")]
    Io(String),

    /// Malformed file contents (WAV headers, filter macro lines, AVI structure).
    #[error("format error: {0}")]
    Format(String),

    /// A codec failed to produce output for a frame.
    #[error("codec error: {0}")]
    Codec(String),

    /// Frame fetch or container assembly failures during an encode run.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GapError {
    /// Build a [`GapError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GapError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`GapError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`GapError::Codec`] value.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Build a [`GapError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
