use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};

use coap_core::clock::Clock;
use coap_core::engine::{Callbacks, Engine, Ring, SlotSelector};
use coap_core::transport::Transport;
use coap_msg::{Code, Packet, Type};
use no_std_net::{IpAddr, Ipv4Addr, SocketAddr};

type TestEngine = Engine<ChannelTransport, FakeClock, 128, 8>;

#[derive(Default)]
struct FakeClock(Cell<u32>);

impl FakeClock {
  fn new(start_ms: u32) -> Self {
    Self(Cell::new(start_ms))
  }

  fn set(&self, ms: u32) {
    self.0.set(ms);
  }
}

impl Clock for FakeClock {
  fn now_ms(&self) -> u32 {
    self.0.get()
  }
}

#[derive(Default)]
struct ChannelTransport {
  outbound: RefCell<std::vec::Vec<(std::vec::Vec<u8>, SocketAddr)>>,
  inbound: RefCell<std::vec::Vec<(std::vec::Vec<u8>, SocketAddr)>>,
}

impl ChannelTransport {
  fn deliver(&self, bytes: &[u8], from: SocketAddr) {
    self.inbound.borrow_mut().push((bytes.to_vec(), from));
  }

  fn sent_ids(&self) -> std::vec::Vec<u16> {
    self.outbound.borrow().iter().map(|(bytes, _)| u16::from_be_bytes([bytes[2], bytes[3]])).collect()
  }
}

impl Transport for ChannelTransport {
  type Error = ();

  fn bind(&mut self, _local_port: u16) -> Result<(), Self::Error> {
    Ok(())
  }

  fn send(&mut self, dest: SocketAddr, bytes: &[u8]) -> nb::Result<(), Self::Error> {
    self.outbound.borrow_mut().push((bytes.to_vec(), dest));
    Ok(())
  }

  fn recv(&mut self, buf: &mut [u8]) -> nb::Result<(usize, SocketAddr), Self::Error> {
    let mut inbound = self.inbound.borrow_mut();
    if inbound.is_empty() {
      return Err(nb::Error::WouldBlock);
    }
    let (bytes, from) = inbound.remove(0);
    buf[..bytes.len()].copy_from_slice(&bytes);
    Ok((bytes.len(), from))
  }
}

fn peer(port: u16) -> SocketAddr {
  SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
}

fn con_get(id: u16) -> std::vec::Vec<u8> {
  let mut p: Packet<128, 8> = Packet::new();
  p.add_header(Type::Con, Code::GET, id).unwrap();
  p.as_bytes().to_vec()
}

fn ack(id: u16) -> std::vec::Vec<u8> {
  let mut p: Packet<128, 8> = Packet::new();
  p.add_header(Type::Ack, Code::EMPTY, id).unwrap();
  p.as_bytes().to_vec()
}

fn new_engine() -> TestEngine {
  let mut engine = TestEngine::new(ChannelTransport::default(), FakeClock::new(0));
  engine.bind(0).unwrap();
  engine.set_destination(peer(5683));
  engine
}

#[test]
fn s3_retransmit_schedule() {
  let mut engine = new_engine();
  engine.enqueue_tx(&con_get(0x0001)).unwrap();

  let schedule = [0u32, 2000, 6000, 14000, 30000];
  for &t in &schedule {
    engine.clock().set(t);
    engine.tick_tx().unwrap();
  }
  assert_eq!(engine.transport().outbound.borrow().len(), 5);

  engine.clock().set(45000);
  engine.tick_tx().unwrap();
  assert_eq!(engine.transport().outbound.borrow().len(), 5, "no 6th datagram after the global deadline");
}

#[test]
fn s4_ack_correlation_fires_on_tx_success_exactly_once() {
  static SUCCESSES: AtomicUsize = AtomicUsize::new(0);
  fn on_success(_: &[u8]) {
    SUCCESSES.fetch_add(1, Ordering::SeqCst);
  }

  let mut engine = new_engine();
  engine.set_callbacks(Callbacks { on_tx_success: Some(on_success), ..Default::default() });

  engine.enqueue_tx(&con_get(0x0007)).unwrap();
  engine.clock().set(0);
  engine.tick_tx().unwrap();

  engine.clock().set(500);
  engine.transport().deliver(&ack(0x0007), peer(5683));
  engine.tick_rx().unwrap();

  assert_eq!(SUCCESSES.load(Ordering::SeqCst), 1);

  engine.tick_tx().unwrap();
  assert_eq!(engine.transport().outbound.borrow().len(), 1, "no retransmit after the ACK cleared the slot");
}

#[test]
fn s5_orphan_ack_does_not_fire_on_tx_success() {
  static SUCCESSES: AtomicUsize = AtomicUsize::new(0);
  fn on_success(_: &[u8]) {
    SUCCESSES.fetch_add(1, Ordering::SeqCst);
  }
  SUCCESSES.store(0, Ordering::SeqCst);

  let mut engine = new_engine();
  engine.set_callbacks(Callbacks { on_tx_success: Some(on_success), ..Default::default() });

  engine.transport().deliver(&ack(0x0099), peer(5683));
  engine.tick_rx().unwrap();

  assert_eq!(SUCCESSES.load(Ordering::SeqCst), 0);
}

#[test]
fn s6_tx_ring_saturates_at_four() {
  let mut engine = new_engine();
  for i in 0..4u16 {
    assert_eq!(engine.enqueue_tx(&con_get(i)).unwrap(), i as usize);
  }
  assert!(engine.enqueue_tx(&con_get(4)).is_err());

  engine.tick_tx().unwrap();
  assert_eq!(engine.transport().sent_ids().len(), 4);
}

#[test]
fn clear_queue_abandons_a_slot_without_firing_callbacks() {
  static FAILURES: AtomicUsize = AtomicUsize::new(0);
  fn on_failure(_: &[u8]) {
    FAILURES.fetch_add(1, Ordering::SeqCst);
  }
  FAILURES.store(0, Ordering::SeqCst);

  let mut engine = new_engine();
  engine.set_callbacks(Callbacks { on_tx_failure: Some(on_failure), ..Default::default() });
  engine.enqueue_tx(&con_get(1)).unwrap();
  engine.clear_queue(Ring::Tx, SlotSelector::Index(0));

  engine.clock().set(100_000);
  engine.tick_tx().unwrap();

  assert_eq!(FAILURES.load(Ordering::SeqCst), 0);
  assert_eq!(engine.transport().outbound.borrow().len(), 0);
}
