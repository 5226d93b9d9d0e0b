/// The primitive integer type carrying ordinal values.
///
/// The domain is 32-bit, but values travel as `u64` so the upper bound can
/// be represented without overflow during the post-increment wrap check.
pub type SequenceValue = u64;

/// Upper bound of the ordinal domain: `2^32 - 1`.
///
/// The allocator wraps with `value >= MAX_SEQUENCE_VALUE`, which means this
/// value is defined but never emitted. Each wrap epoch therefore carries
/// `2^32 - 1` usable values, `[0, MAX_SEQUENCE_VALUE)`. The verifier's
/// permitted wrap pair depends on this exact boundary.
pub const MAX_SEQUENCE_VALUE: SequenceValue = (1 << 32) - 1;

/// Sequence name used when a request does not name one.
pub const DEFAULT_SEQUENCE: &str = "default";
