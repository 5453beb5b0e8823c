//! # Core Error Types
//!
//! All errors that can occur while configuring a session or decoding an
//! exported audit log. Nothing here is raised by the aggregator itself:
//! violations are evidence, not faults.

use crate::channel::ViolationChannel;
use thiserror::Error;

/// Errors raised by `vigil_core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The TOML document could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A threshold rule lists no channels.
    #[error("rule `{0}` has no channels")]
    EmptyRule(String),

    /// A threshold rule has a zero limit.
    #[error("rule `{0}` has a zero limit")]
    ZeroLimit(String),

    /// A channel is claimed by more than one rule.
    #[error("channel {channel} is claimed by rules `{first}` and `{second}`")]
    OverlappingRules {
        /// The contested channel.
        channel: ViolationChannel,
        /// First rule naming it.
        first: String,
        /// Second rule naming it.
        second: String,
    },

    /// The audit log header did not carry the expected magic number.
    #[error("not a vigil audit log (magic {0:#010x})")]
    BadMagic(u32),

    /// The audit log was written by a newer format version.
    #[error("unsupported audit log version {0}")]
    UnsupportedVersion(u32),

    /// A record ended before its declared size.
    #[error("truncated audit log: expected {expected} records, found {found}")]
    Truncated {
        /// Records declared by the header.
        expected: u32,
        /// Records actually present.
        found: u32,
    },

    /// A record carried a kind/code pair that does not decode.
    #[error("corrupt audit record {index}: kind {kind}, code {code}")]
    CorruptRecord {
        /// Record position.
        index: u32,
        /// Raw kind byte.
        kind: u8,
        /// Raw code byte.
        code: u8,
    },

    /// Underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
