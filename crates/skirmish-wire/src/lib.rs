//! Skirmish Wire - the bit-packed network protocol
//!
//! This crate provides:
//! - `BitWriter` / `BitReader` with ranged integers, quantized floats,
//!   length-prefixed strings and checkpoint tokens
//! - The `Message` sum type, encoded as a tag byte plus body and decoded
//!   through a tag-indexed decoder table
//! - Full and delta snapshot bodies, the latter reconstructed against a
//!   baseline fetched through `SnapshotLookup`
//!
//! Decoding is total: malformed input yields an `Error`, never a panic.

mod bits;
mod error;
mod message;
pub mod snapshot;

pub use bits::{bits_required, BitReader, BitWriter, CHECKPOINT, MAX_STRING_LEN};
pub use error::{Error, Result};
pub use message::{ClientState, Message, MessageTag};
