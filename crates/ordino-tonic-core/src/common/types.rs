//! Shared value types and packing constants.
//!
//! Client and server must agree on how a block travels: a stream of
//! `BlockChunk` messages whose payload is little-endian [`SequenceValue`]s
//! in allocation order. These constants pin that compile-time contract.

pub use ordino::{DEFAULT_SEQUENCE, MAX_SEQUENCE_VALUE, SequenceValue};

/// Number of bytes one packed [`SequenceValue`] occupies in a chunk
/// payload.
///
/// Used for allocating chunk buffers and decoding packed value streams.
pub const SEQUENCE_VALUE_SIZE: usize = core::mem::size_of::<SequenceValue>();
