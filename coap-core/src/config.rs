//! Compile-time tunables for the engine.
//!
//! These are `const`s rather than runtime configuration because a build
//! targets one fixed memory layout: a device that needs different limits
//! recompiles against different consts, mirroring the `#define`-based
//! configuration of the Arduino library this crate's wire format and timing
//! schedule are compatible with.

/// Maximum encoded PDU size in bytes.
pub const MAX_PDU: usize = coap_msg::MAX_PDU;

/// Maximum number of options indexed per packet.
pub const MAX_OPTIONS: usize = coap_msg::MAX_OPTIONS;

/// Depth of each of the TX and RX rings.
pub const MAX_QUEUE: usize = 4;

/// Base delay, in milliseconds, before a confirmable's first retransmit.
pub const ACK_TIMEOUT_MS: u32 = 2000;

/// Numerator of `ACK_RANDOM_FACTOR` (1.5, expressed as a ratio to stay in
/// integer arithmetic).
pub const ACK_RANDOM_FACTOR_NUM: u32 = 3;

/// Denominator of `ACK_RANDOM_FACTOR`.
pub const ACK_RANDOM_FACTOR_DEN: u32 = 2;

/// Maximum number of retransmits after the initial send; at most
/// `MAX_RETRANSMIT + 1` total transmission attempts.
pub const MAX_RETRANSMIT: u8 = 4;

/// Total wall-clock budget, in milliseconds, for a confirmable's retransmit
/// campaign from its first send: `ACK_TIMEOUT * (2^MAX_RETRANSMIT - 1) *
/// ACK_RANDOM_FACTOR`.
pub const MAJOR_TIMEOUT_MS: u32 = {
  let doublings = (1u32 << MAX_RETRANSMIT as u32) - 1;
  ACK_TIMEOUT_MS * doublings * ACK_RANDOM_FACTOR_NUM / ACK_RANDOM_FACTOR_DEN
};
