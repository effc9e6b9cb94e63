//! `std`-only adapters: a [`clock::Clock`](crate::clock::Clock) backed by
//! `std::time::Instant` and a [`transport::Transport`](crate::transport::Transport)
//! backed by `std::net::UdpSocket`, for hosts that have an OS underneath
//! them (development machines, integration tests, a CoAP-to-IP gateway).

use std::io;
use std::net::UdpSocket;
use std::time::Instant;

use no_std_net::SocketAddr;

use crate::clock::Clock;
use crate::transport::Transport;

/// A millisecond clock anchored to the moment it was constructed.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock(Instant);

impl Default for SystemClock {
  fn default() -> Self {
    Self::new()
  }
}

impl SystemClock {
  /// Starts a new clock, anchored to now.
  pub fn new() -> Self {
    Self(Instant::now())
  }
}

impl Clock for SystemClock {
  fn now_ms(&self) -> u32 {
    self.0.elapsed().as_millis() as u32
  }
}

impl Transport for UdpSocket {
  type Error = io::Error;

  fn bind(&mut self, local_port: u16) -> Result<(), Self::Error> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], local_port));
    *self = UdpSocket::bind(addr)?;
    self.set_nonblocking(true)
  }

  fn send(&mut self, dest: SocketAddr, bytes: &[u8]) -> nb::Result<(), Self::Error> {
    UdpSocket::send_to(self, bytes, std_addr_from_no_std(dest)).map(|_| ())
                                                                .map_err(io_to_nb)
  }

  fn recv(&mut self, buf: &mut [u8]) -> nb::Result<(usize, SocketAddr), Self::Error> {
    UdpSocket::recv_from(self, buf).map(|(n, addr)| (n, no_std_addr_from_std(addr)))
                                    .map_err(io_to_nb)
  }
}

fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

fn std_addr_v4_from_no_std(addr: no_std_net::SocketAddrV4) -> std::net::SocketAddr {
  let [a, b, c, d] = addr.ip().octets();
  let ip = std::net::Ipv4Addr::new(a, b, c, d);
  std::net::SocketAddr::V4(std::net::SocketAddrV4::new(ip, addr.port()))
}

fn std_addr_v6_from_no_std(addr: no_std_net::SocketAddrV6) -> std::net::SocketAddr {
  let [a, b, c, d, e, f, g, h] = addr.ip().segments();
  let ip = std::net::Ipv6Addr::new(a, b, c, d, e, f, g, h);
  std::net::SocketAddr::V6(std::net::SocketAddrV6::new(ip, addr.port(), addr.flowinfo(), addr.scope_id()))
}

fn std_addr_from_no_std(addr: SocketAddr) -> std::net::SocketAddr {
  match addr {
    | SocketAddr::V4(sock) => std_addr_v4_from_no_std(sock),
    | SocketAddr::V6(sock) => std_addr_v6_from_no_std(sock),
  }
}

fn no_std_addr_v4_from_std(addr: std::net::SocketAddrV4) -> SocketAddr {
  let [a, b, c, d] = addr.ip().octets();
  let ip = no_std_net::Ipv4Addr::new(a, b, c, d);
  SocketAddr::V4(no_std_net::SocketAddrV4::new(ip, addr.port()))
}

fn no_std_addr_v6_from_std(addr: std::net::SocketAddrV6) -> SocketAddr {
  let [a, b, c, d, e, f, g, h] = addr.ip().segments();
  let ip = no_std_net::Ipv6Addr::new(a, b, c, d, e, f, g, h);
  SocketAddr::V6(no_std_net::SocketAddrV6::new(ip, addr.port(), addr.flowinfo(), addr.scope_id()))
}

fn no_std_addr_from_std(addr: std::net::SocketAddr) -> SocketAddr {
  match addr {
    | std::net::SocketAddr::V4(sock) => no_std_addr_v4_from_std(sock),
    | std::net::SocketAddr::V6(sock) => no_std_addr_v6_from_std(sock),
  }
}
