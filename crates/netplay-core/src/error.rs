//! Error types for the netplay core.

use thiserror::Error;

/// Core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Frame decoding error
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Configuration rejected
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Frame-level decode errors
///
/// Every malformed or hostile input maps to one of these; decoding never
/// panics or reads out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Fewer bytes present than the header (or the header itself) requires
    #[error("truncated input: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// The compressed payload was rejected by the decompressor
    #[error("corrupt compressed stream: {0}")]
    CorruptStream(String),

    /// Declared uncompressed length exceeds the configured ceiling
    #[error("declared length {declared} exceeds limit of {limit} bytes")]
    SizeLimitExceeded {
        /// Length claimed by the header
        declared: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// Bytes left over after a standalone frame
    #[error("{0} trailing bytes after frame")]
    TrailingBytes(usize),
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Size ceiling is zero or cannot be expressed in the 32-bit length field
    #[error("invalid size ceiling: {0}")]
    InvalidSizeLimit(usize),

    /// zlib only accepts levels 0 through 9
    #[error("invalid compression level: {0}")]
    InvalidCompressionLevel(u32),

    /// Liveness timeout must be non-zero
    #[error("liveness timeout must be non-zero")]
    ZeroTimeout,
}
