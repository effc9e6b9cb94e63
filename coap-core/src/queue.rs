//! One `(packet, status, timestamp)` slot — the unit the TX and RX rings are
//! built from.

use coap_msg::{Packet, Type};

const FILLED: u8 = 0b1000_0000;
const IS_CON: u8 = 0b0100_0000;
const ACK_RCVD: u8 = 0b0001_0000;
const PROCESSED: u8 = 0b0000_1000;
const TRANSMISSIONS_MASK: u8 = 0b0000_0111;

/// Transmission counts saturate here (`MAX_RETRANSMIT + 1`); a slot is never
/// allowed to report more attempts than this.
pub const MAX_TRANSMISSIONS: u8 = 5;

/// One ring slot: a pre-allocated, reused packet plus the status byte and
/// timestamp described in the engine's queue-slot design. `status` bits are
/// laid out MSB to LSB as `FILLED | IS_CON | ACK_RCVD | PROCESSED |
/// transmissions(3 bits)`.
#[derive(Clone, Debug, Default)]
pub struct QueueSlot<const CAP: usize, const MAX_OPTS: usize> {
  /// The slot's packet. Only meaningful while `is_filled()`.
  pub packet: Packet<CAP, MAX_OPTS>,
  status: u8,
  /// Milliseconds of the last meaningful state change: send attempt for a
  /// TX slot, arrival for an RX slot. Drives the per-attempt response
  /// deadline.
  pub timestamp: u32,
  /// Milliseconds of the slot's first send. Distinct from `timestamp` once a
  /// TX slot has retransmitted; drives the global deadline, which is always
  /// measured from the first attempt, not from enqueue time or the most
  /// recent retransmit. Zero until `record_send` has been called once.
  pub first_sent: u32,
}

impl<const CAP: usize, const MAX_OPTS: usize> QueueSlot<CAP, MAX_OPTS> {
  /// An empty, unfilled slot.
  pub fn new() -> Self {
    Self::default()
  }

  /// `FILLED`: the slot currently holds a live packet.
  pub fn is_filled(&self) -> bool {
    self.status & FILLED != 0
  }

  /// `IS_CON`: the slot's message is a confirmable.
  pub fn is_con(&self) -> bool {
    self.status & IS_CON != 0
  }

  /// `ACK_RCVD`: this (inbound) slot is itself an ACK.
  pub fn ack_rcvd(&self) -> bool {
    self.status & ACK_RCVD != 0
  }

  /// `PROCESSED`: the user has finished with this slot and it may be reaped.
  pub fn processed(&self) -> bool {
    self.status & PROCESSED != 0
  }

  /// Number of transmission attempts made so far, saturating at
  /// `MAX_TRANSMISSIONS`.
  pub fn transmissions(&self) -> u8 {
    self.status & TRANSMISSIONS_MASK
  }

  /// Fills this slot with `packet`, stamping `now` as its arrival time (an
  /// RX slot has no other timestamp) and deriving `IS_CON` from the packet's
  /// type. Transmission count starts at 0; `first_sent` is left at 0 until
  /// the slot is actually sent.
  pub fn fill(&mut self, packet: Packet<CAP, MAX_OPTS>, now: u32) {
    self.packet = packet;
    self.timestamp = now;
    self.first_sent = 0;
    self.status = FILLED;
    if self.packet.ty() == Type::Con {
      self.status |= IS_CON;
    }
  }

  /// Sets `ACK_RCVD` (used when an inbound datagram is itself an ACK).
  pub fn set_ack_rcvd(&mut self) {
    self.status |= ACK_RCVD;
  }

  /// Sets `PROCESSED`.
  pub fn set_processed(&mut self) {
    self.status |= PROCESSED;
  }

  /// Increments the transmission counter, saturating at
  /// `MAX_TRANSMISSIONS`, and stamps `now` as the time of this send. The
  /// very first call also stamps `first_sent`, which later calls leave
  /// alone — it anchors the global deadline to the first attempt.
  pub fn record_send(&mut self, now: u32) {
    let count = self.transmissions();
    if count == 0 {
      self.first_sent = now;
    }
    if count < MAX_TRANSMISSIONS {
      self.status = (self.status & !TRANSMISSIONS_MASK) | (count + 1);
    }
    self.timestamp = now;
  }

  /// Zeroes `status` and `timestamp`. Does not scrub the packet buffer — the
  /// next `fill` overwrites it.
  pub fn clear(&mut self) {
    self.status = 0;
    self.timestamp = 0;
    self.first_sent = 0;
  }
}
