//! Unified error types for the funding scanner.

use thiserror::Error;

use crate::exchange::Platform;

/// Unified error type for the funding scanner.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Exchange source error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Durable store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by exchange source adapters.
///
/// A snapshot fetch that partially fails must surface as
/// [`SourceError::Unavailable`], never as an empty success.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The exchange snapshot could not be fetched this cycle.
    #[error("{platform} snapshot unavailable: {reason}")]
    Unavailable {
        /// Platform whose fetch failed.
        platform: Platform,
        /// Reason for failure.
        reason: String,
    },

    /// Per-symbol interval lookup failed.
    #[error("{platform} interval lookup failed for {symbol}: {reason}")]
    IntervalLookupFailed {
        /// Platform the lookup targeted.
        platform: Platform,
        /// Symbol that could not be resolved.
        symbol: String,
        /// Reason for failure.
        reason: String,
    },

    /// The platform has a fixed funding period and exposes no per-symbol
    /// interval endpoint.
    #[error("{platform} does not expose per-symbol funding intervals")]
    IntervalUnsupported {
        /// Platform that was asked.
        platform: Platform,
    },
}

/// Durable key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading the backing file failed.
    #[error("failed to read store {path}: {source}")]
    ReadFailed {
        /// Path of the backing file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Writing the backing file failed.
    #[error("failed to write store {path}: {source}")]
    WriteFailed {
        /// Path of the backing file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The backing file exists but does not parse.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        /// Path of the backing file.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The value could not be encoded for persistence.
    #[error("failed to encode store {path}: {source}")]
    EncodeFailed {
        /// Path of the backing file.
        path: String,
        /// Underlying encode error.
        source: serde_json::Error,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ScannerError>;
