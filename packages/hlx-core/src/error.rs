//! Centralized error types for the HLX core library.
//!
//! This module provides a unified error handling system built on
//! `thiserror`, with a machine-readable code per variant for logging
//! and for the `(ERROR)` wire frame.

use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and diagnostics.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the HLX protocol and dispatch engine.
///
/// Every variant here corresponds to one of the error kinds a handler or
/// exchange can produce. None of these propagate across a connection
/// boundary as a typed error on the wire — handlers convert them to either
/// `(ERROR)` or, for `ValueAlreadySet`, to silent success.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HlxError {
    /// Frame matched no catalog pattern, arity mismatch, or numeric parse failure.
    #[error("bad command: {0}")]
    BadCommand(String),

    /// Identifier or value outside its closed range.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// No-op mutation; callers generally treat this as success.
    #[error("value already set")]
    ValueAlreadySet,

    /// `SetVolume` attempted on a volume-locked zone.
    #[error("volume is fixed")]
    VolumeIsFixed,

    /// The backup document is absent.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// The backup document is present but structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Storage or socket I/O failure.
    #[error("I/O error: {0}")]
    IOError(String),

    /// A client exchange expired before a response arrived.
    #[error("exchange timed out")]
    Timeout,

    /// The connection closed with work still in flight.
    #[error("disconnected")]
    Disconnected,

    /// The peer replied with `(ERROR)`.
    #[error("peer returned a protocol error")]
    ProtocolError,
}

impl ErrorCode for HlxError {
    fn code(&self) -> &'static str {
        match self {
            Self::BadCommand(_) => "bad_command",
            Self::OutOfRange(_) => "out_of_range",
            Self::ValueAlreadySet => "value_already_set",
            Self::VolumeIsFixed => "volume_is_fixed",
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::IOError(_) => "io_error",
            Self::Timeout => "timeout",
            Self::Disconnected => "disconnected",
            Self::ProtocolError => "protocol_error",
        }
    }

    // NOTE: `code()` is also exposed as an inherent method below so call
    // sites don't need `use hlx_core::error::ErrorCode` just to log it.
}

impl HlxError {
    /// Returns a machine-readable error code, mirroring [`ErrorCode::code`].
    pub fn code(&self) -> &'static str {
        ErrorCode::code(self)
    }

    /// True for the two outcomes a handler treats as a successful no-op
    /// (§4.5 step 4): the value didn't change, or an adjustment saturated.
    pub fn is_noop_success(&self) -> bool {
        matches!(self, Self::ValueAlreadySet)
    }
}

impl From<std::io::Error> for HlxError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for HlxError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

/// Convenient Result alias for application-wide operations.
pub type HlxResult<T> = Result<T, HlxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_fixed_returns_correct_code() {
        let err = HlxError::VolumeIsFixed;
        assert_eq!(err.code(), "volume_is_fixed");
    }

    #[test]
    fn out_of_range_carries_detail() {
        let err = HlxError::OutOfRange("zone 25".into());
        assert_eq!(err.code(), "out_of_range");
        assert!(err.to_string().contains("zone 25"));
    }

    #[test]
    fn value_already_set_is_noop_success() {
        assert!(HlxError::ValueAlreadySet.is_noop_success());
        assert!(!HlxError::Timeout.is_noop_success());
    }

    #[test]
    fn io_error_converts_from_std_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: HlxError = io_err.into();
        assert_eq!(err.code(), "io_error");
    }
}
