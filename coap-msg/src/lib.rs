#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

//! Low-level CoAP (RFC 7252) message parsing and serialization for
//! fixed-capacity, `no_std` targets.
//!
//! A [`Packet`] is a fixed-size byte buffer plus an index of its header
//! fields and options; this crate knows nothing about sockets, timers or
//! retransmission — see `coap-core` for the engine built on top of it.

mod error;
mod header;
mod option;
mod packet;

pub use error::{BuildError, ParseError};
pub use header::{Code, Type};
pub use option::{is_recognised, OptionEntry};
pub use packet::Packet;

/// Default maximum CoAP PDU size in bytes, matching the Arduino library's
/// `MAX_SIZE` this crate's wire format is compatible with.
pub const MAX_PDU: usize = 1250;

/// Default maximum number of options indexed per packet.
pub const MAX_OPTIONS: usize = 100;

/// Maximum legal CoAP token length in bytes (RFC 7252 §3).
pub const MAX_TOKEN_LEN: usize = 8;

/// A [`Packet`] sized to the crate's default `MAX_PDU`/`MAX_OPTIONS` limits.
pub type DefaultPacket = Packet<MAX_PDU, MAX_OPTIONS>;
