//! The protocol engine: two fixed-capacity rings, periodic ticks, the
//! retransmit and ACK-correlation state machines, and callback dispatch.

use coap_msg::{Packet, Type};
use no_std_net::SocketAddr;

use crate::clock::Clock;
use crate::config::{MAX_OPTIONS, MAX_PDU, MAX_QUEUE};
use crate::queue::QueueSlot;
use crate::retry::{major_deadline_passed, response_deadline_passed};
use crate::transport::Transport;

/// Errors the engine's queueing operations can report. Protocol-level
/// failures (a timed-out confirmable, a rejected send) are reported
/// asynchronously through callbacks instead, per the engine's error model.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
  /// No free slot was available in the targeted ring.
  Full,
  /// `enqueue_tx` was given bytes that don't parse as a CoAP message.
  Parse(coap_msg::ParseError),
}

/// Which ring an operation targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ring {
  /// The outbound ring.
  Tx,
  /// The inbound ring.
  Rx,
}

/// A single slot, or every slot in the ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotSelector {
  /// Just the slot at this index.
  Index(usize),
  /// Every slot in the ring.
  All,
}

/// The four callback slots a caller may register. Plain function pointers
/// rather than closures or trait objects, since the engine never allocates;
/// an unregistered callback is a silent no-op.
#[derive(Default)]
pub struct Callbacks {
  /// Fired when an inbound NON/RST, or a not-yet-expired inbound CON, is
  /// ready for the user to look at.
  pub on_packet_available: Option<fn(&[u8])>,
  /// Fired once a CON's matching ACK has been correlated.
  pub on_tx_success: Option<fn(&[u8])>,
  /// Fired when a CON's global deadline has expired without an ACK.
  pub on_tx_failure: Option<fn(&[u8])>,
  /// Fired when an inbound CON was not serviced (replied to or marked
  /// processed) before its response deadline.
  pub on_response_timeout: Option<fn(&[u8])>,
}

fn fire(callback: Option<fn(&[u8])>, bytes: &[u8]) {
  if let Some(f) = callback {
    f(bytes);
  }
}

/// Two fixed-capacity rings, a transport and a clock, and the retransmit /
/// ACK-correlation loop that ties them together. Owns all of its state; a
/// host may run as many instances as it has memory for, each bound to a
/// different local port and peer.
pub struct Engine<T: Transport, C: Clock, const CAP: usize = MAX_PDU, const MAX_OPTS: usize = MAX_OPTIONS> {
  transport: T,
  clock: C,
  destination: Option<SocketAddr>,
  tx: [QueueSlot<CAP, MAX_OPTS>; MAX_QUEUE],
  rx: [QueueSlot<CAP, MAX_OPTS>; MAX_QUEUE],
  callbacks: Callbacks,
}

impl<T: Transport, C: Clock, const CAP: usize, const MAX_OPTS: usize> Engine<T, C, CAP, MAX_OPTS> {
  /// Builds an engine around an already-constructed transport and clock.
  /// Call `bind` before ticking it.
  pub fn new(transport: T, clock: C) -> Self {
    Self { transport,
           clock,
           destination: None,
           tx: Default::default(),
           rx: Default::default(),
           callbacks: Callbacks::default() }
  }

  /// Initialises the transport on `local_port` and zeroes both rings.
  pub fn bind(&mut self, local_port: u16) -> Result<(), T::Error> {
    self.transport.bind(local_port)?;
    self.tx = Default::default();
    self.rx = Default::default();
    Ok(())
  }

  /// Configures the single outbound peer this engine talks to.
  pub fn set_destination(&mut self, peer: SocketAddr) {
    self.destination = Some(peer);
  }

  /// Registers the callback set, replacing any previously registered.
  pub fn set_callbacks(&mut self, callbacks: Callbacks) {
    self.callbacks = callbacks;
  }

  /// Borrows the underlying transport, e.g. to inspect a test double's
  /// captured traffic.
  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// Borrows the underlying clock, e.g. to advance a test double.
  pub fn clock(&self) -> &C {
    &self.clock
  }

  fn first_free(ring: &[QueueSlot<CAP, MAX_OPTS>; MAX_QUEUE]) -> Option<usize> {
    ring.iter().position(|slot| !slot.is_filled())
  }

  /// Parses `encoded` and copies it into the first free TX slot, marking it
  /// `FILLED` and, if the message is a confirmable, `IS_CON`.
  pub fn enqueue_tx(&mut self, encoded: &[u8]) -> Result<usize, EngineError> {
    let packet: Packet<CAP, MAX_OPTS> = Packet::parse(encoded).map_err(EngineError::Parse)?;
    let index = Self::first_free(&self.tx).ok_or(EngineError::Full)?;
    let now = self.clock.now_ms();
    log::trace!("enqueue_tx: slot {} id={:#06x} len={}", index, packet.message_id(), encoded.len());
    self.tx[index].fill(packet, now);
    Ok(index)
  }

  /// Allocates a TX slot holding an ACK whose code and message_id mirror the
  /// RX slot at `rx_index`.
  pub fn empty_ack(&mut self, rx_index: usize) -> Result<usize, EngineError> {
    let code = self.rx[rx_index].packet.code();
    let message_id = self.rx[rx_index].packet.message_id();
    let tx_index = Self::first_free(&self.tx).ok_or(EngineError::Full)?;
    let mut ack: Packet<CAP, MAX_OPTS> = Packet::new();
    ack.add_header(Type::Ack, code, message_id)
       .expect("a bare 4-byte ACK header always fits in a non-trivial PDU capacity");
    let now = self.clock.now_ms();
    self.tx[tx_index].fill(ack, now);
    Ok(tx_index)
  }

  /// Sets `PROCESSED` on every `FILLED` RX slot whose message_id matches.
  pub fn mark_processed(&mut self, message_id: u16) {
    for slot in self.rx.iter_mut() {
      if slot.is_filled() && slot.packet.message_id() == message_id {
        slot.set_processed();
      }
    }
  }

  /// Zeroes one slot, or every slot, in the given ring. Clearing a
  /// mid-retransmission TX slot silently abandons it; clearing an RX slot
  /// drops a pending delivery. Neither fires a callback.
  pub fn clear_queue(&mut self, ring: Ring, selector: SlotSelector) {
    let target = match ring {
      | Ring::Tx => &mut self.tx,
      | Ring::Rx => &mut self.rx,
    };
    match selector {
      | SlotSelector::Index(i) => target[i].clear(),
      | SlotSelector::All => target.iter_mut().for_each(QueueSlot::clear),
    }
  }

  /// Runs `process_tx_queue`: drives retransmit timers and emits outbound
  /// datagrams.
  pub fn tick_tx(&mut self) -> Result<(), T::Error> {
    let now = self.clock.now_ms();
    for i in 0..MAX_QUEUE {
      self.process_tx_slot(i, now)?;
    }
    Ok(())
  }

  fn send_slot(&mut self, i: usize, now: u32) -> Result<(), T::Error> {
    let Some(dest) = self.destination else {
      log::warn!("tick_tx: slot {} ready to send but no destination is configured", i);
      return Ok(());
    };
    let bytes = self.tx[i].packet.as_bytes();
    log::trace!("tick_tx: sending slot {} id={:#06x} len={}",
                i,
                self.tx[i].packet.message_id(),
                bytes.len());
    match self.transport.send(dest, bytes) {
      | Ok(()) | Err(nb::Error::WouldBlock) => {},
      | Err(nb::Error::Other(e)) => return Err(e),
    }
    self.tx[i].record_send(now);
    Ok(())
  }

  fn process_tx_slot(&mut self, i: usize, now: u32) -> Result<(), T::Error> {
    if !self.tx[i].is_filled() {
      return Ok(());
    }

    if self.tx[i].transmissions() == 0 {
      return self.send_slot(i, now);
    }

    if !self.tx[i].is_con() {
      log::trace!("tick_tx: slot {} one-shot delivery complete", i);
      self.tx[i].clear();
      return Ok(());
    }

    let first_sent = self.tx[i].first_sent;
    if major_deadline_passed(now, first_sent) {
      log::warn!("tick_tx: slot {} hit its global deadline", i);
      fire(self.callbacks.on_tx_failure, self.tx[i].packet.as_bytes());
      self.tx[i].clear();
      return Ok(());
    }

    let transmissions = self.tx[i].transmissions();
    let last_send = self.tx[i].timestamp;
    if transmissions < 5 && response_deadline_passed(now, last_send, transmissions) {
      log::debug!("tick_tx: retransmitting slot {} (attempt {})", i, transmissions + 1);
      return self.send_slot(i, now);
    }

    if transmissions == 5 {
      fire(self.callbacks.on_tx_failure, self.tx[i].packet.as_bytes());
      self.tx[i].clear();
    }

    Ok(())
  }

  /// Polls the transport for one datagram; on arrival, copies it into a free
  /// RX slot, parses it, stamps the arrival time, and runs
  /// `process_rx_queue`. A parse failure silently discards the datagram.
  pub fn tick_rx(&mut self) -> Result<(), T::Error> {
    let mut buf = [0u8; CAP];
    if let Some((len, _from)) = self.transport.poll_recv(&mut buf)? {
      self.receive_datagram(&buf[..len]);
    }
    self.process_rx_queue();
    Ok(())
  }

  fn receive_datagram(&mut self, bytes: &[u8]) {
    let now = self.clock.now_ms();
    let packet: Packet<CAP, MAX_OPTS> = match Packet::parse(bytes) {
      | Ok(p) => p,
      | Err(e) => {
        log::warn!("tick_rx: discarding unparseable datagram: {}", e);
        return;
      },
    };
    log::trace!("tick_rx: received id={:#06x} len={}", packet.message_id(), bytes.len());

    let Some(index) = Self::first_free(&self.rx) else {
      log::warn!("tick_rx: rx ring full, dropping datagram id={:#06x}", packet.message_id());
      return;
    };

    let ty = packet.ty();
    self.rx[index].fill(packet, now);
    match ty {
      | Type::Ack => self.rx[index].set_ack_rcvd(),
      | Type::Con => {}, // fill() already derived IS_CON from the packet's type
      | Type::Non | Type::Rst => {},
    }
  }

  fn process_rx_queue(&mut self) {
    let now = self.clock.now_ms();
    for i in 0..MAX_QUEUE {
      self.process_rx_slot(i, now);
    }
  }

  fn process_rx_slot(&mut self, i: usize, now: u32) {
    if !self.rx[i].is_filled() {
      return;
    }

    if self.rx[i].processed() {
      self.rx[i].clear();
      return;
    }

    if self.rx[i].ack_rcvd() {
      let message_id = self.rx[i].packet.message_id();
      let matching_tx = self.tx.iter().position(|slot| slot.is_filled() && slot.packet.message_id() == message_id);
      match matching_tx {
        | Some(tx_index) => {
          fire(self.callbacks.on_tx_success, self.rx[i].packet.as_bytes());
          self.tx[tx_index].clear();
          self.rx[i].clear();
        },
        | None => {
          log::debug!("process_rx_queue: orphan ACK id={:#06x}", message_id);
          self.rx[i].clear();
        },
      }
      return;
    }

    if self.rx[i].is_con() {
      let arrived_at = self.rx[i].timestamp;
      if response_deadline_passed(now, arrived_at, 1) {
        if let Some(tx_index) = Self::first_free(&self.tx) {
          let code = self.rx[i].packet.code();
          let message_id = self.rx[i].packet.message_id();
          let mut ack: Packet<CAP, MAX_OPTS> = Packet::new();
          ack.add_header(Type::Ack, code, message_id)
             .expect("a bare 4-byte ACK header always fits in a non-trivial PDU capacity");
          self.tx[tx_index].fill(ack, now);
          if let Some(dest) = self.destination {
            let _ = self.transport.send(dest, self.tx[tx_index].packet.as_bytes());
          }
          self.tx[tx_index].clear();
          self.rx[i].clear();
        }
        // no free TX slot: leave the RX slot in place so the next tick retries
        fire(self.callbacks.on_response_timeout, self.rx[i].packet.as_bytes());
        return;
      }

      fire(self.callbacks.on_packet_available, self.rx[i].packet.as_bytes());
      return;
    }

    fire(self.callbacks.on_packet_available, self.rx[i].packet.as_bytes());
  }
}
