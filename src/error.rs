//! Unified error type for the provisionee.
//!
//! Every subsystem (streams, JSON, Wi-Fi manager, DSS client, task) returns
//! this one `Copy` enum so the task loop can short-circuit with `?` and the
//! caller sees the first failure verbatim.

use core::fmt;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Generic failure: malformed response, signature mismatch, unexpected
    /// field type, driver error.  The tag names where it happened.
    Failed(&'static str),
    /// A fixed buffer is too small for the attempted write or append.
    Overrun,
    /// Fewer bytes are available than a read or parse requires.
    Underrun,
    /// An optional capability is absent.  Callers usually fall back to a
    /// default instead of propagating this.
    NotImplemented,
    /// A lock or completion signal could not be obtained.
    Timeout,
}

impl Error {
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(what) => write!(f, "failed: {what}"),
            Self::Overrun => write!(f, "buffer overrun"),
            Self::Underrun => write!(f, "buffer underrun"),
            Self::NotImplemented => write!(f, "not implemented"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl core::error::Error for Error {}

impl From<base64::DecodeError> for Error {
    fn from(_: base64::DecodeError) -> Self {
        Self::Failed("base64 decode")
    }
}

impl From<base64::DecodeSliceError> for Error {
    fn from(e: base64::DecodeSliceError) -> Self {
        match e {
            base64::DecodeSliceError::OutputSliceTooSmall => Self::Overrun,
            base64::DecodeSliceError::DecodeError(_) => Self::Failed("base64 decode"),
        }
    }
}

impl From<base64::EncodeSliceError> for Error {
    fn from(_: base64::EncodeSliceError) -> Self {
        Self::Overrun
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Timeout
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Treat `NotImplemented` as "absent" for optional lookups.
pub trait ResultExt<T> {
    fn or_not_implemented(self) -> Result<Option<T>>;
}

impl<T> ResultExt<T> for Result<T> {
    fn or_not_implemented(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(Error::NotImplemented) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
