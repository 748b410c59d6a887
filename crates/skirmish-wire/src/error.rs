//! Error types for skirmish-wire

use skirmish_core::Tick;
use thiserror::Error;

/// Wire codec error type
///
/// Decoding never panics; every malformed input ends up here.
#[derive(Debug, Error)]
pub enum Error {
    /// Ran out of bits mid-message
    #[error("Unexpected end of message")]
    UnexpectedEnd,

    /// Checkpoint token mismatch between writer and reader
    #[error("Serialization desync: expected checkpoint {expected:#06x}, found {found:#06x}")]
    Desync { expected: u32, found: u32 },

    /// Leading type tag has no decoder
    #[error("Unknown message tag {0}")]
    UnknownTag(u8),

    /// A field is outside the range the protocol can carry
    #[error("Invalid value {value} for field {field}")]
    InvalidValue { field: &'static str, value: u64 },

    /// String longer than the length prefix can express
    #[error("String of {0} bytes exceeds the 255 byte limit")]
    StringTooLong(usize),

    /// Delta snapshot against a baseline the receiver does not have
    #[error("Missing delta baseline for tick {0}")]
    MissingBaseline(Tick),
}

/// Result type for wire operations
pub type Result<T> = std::result::Result<T, Error>;
