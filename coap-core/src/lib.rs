//! A client-side CoAP engine for resource-constrained devices talking over
//! UDP.
//!
//! This crate owns everything above the wire format: bounded transmit and
//! receive rings, confirmable-message retransmission with exponential
//! back-off, ACK correlation, and callback dispatch to user code. The wire
//! format itself — encoding and decoding a [`coap_msg::Packet`] — lives in
//! the `coap-msg` crate this one depends on.
//!
//! ## Shape
//!
//! An [`Engine`] owns two fixed-capacity rings of [`QueueSlot`]s (outbound
//! and inbound), a [`Transport`] handle and a [`Clock`] handle. A host calls
//! `tick_tx`/`tick_rx` from its main loop; the engine does no internal
//! threading and performs no suspension of its own.
//!
//! [`Engine`]: engine::Engine
//! [`QueueSlot`]: queue::QueueSlot
//! [`Transport`]: transport::Transport
//! [`Clock`]: clock::Clock

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Monotonic time capability the engine consumes.
pub mod clock;
/// Compile-time tunables (PDU size, queue depth, retransmit schedule).
pub mod config;
/// The retransmit/ACK-correlation state machine and its two rings.
pub mod engine;
/// One `(packet, status, timestamp)` ring slot.
pub mod queue;
/// RFC 7252 retransmit-schedule arithmetic.
pub mod retry;
/// Non-blocking UDP capability the engine consumes.
pub mod transport;

#[cfg(feature = "std")]
/// `std::net::UdpSocket` and `std::time::Instant`-backed implementations of
/// [`transport::Transport`] and [`clock::Clock`], for hosts that aren't
/// actually resource-constrained (development machines, integration tests,
/// a gateway bridging CoAP to a richer network).
pub mod std_impl;

pub use engine::{Callbacks, Engine, EngineError, Ring, SlotSelector};
pub use queue::QueueSlot;

pub use coap_msg;
