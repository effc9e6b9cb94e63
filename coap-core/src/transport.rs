//! The UDP capability the engine requires from its host.

use no_std_net::SocketAddr;

/// A non-blocking UDP transport.
///
/// Grounded on the socket capability the engine this one is modelled on
/// exposes: `send`/`recv` report `nb::Error::WouldBlock` rather than
/// blocking the single cooperative task, and addresses travel alongside the
/// bytes rather than the transport holding a fixed peer.
pub trait Transport {
  /// The transport's I/O error type.
  type Error: core::fmt::Debug;

  /// Binds the transport to a local UDP port, ready to send and receive.
  fn bind(&mut self, local_port: u16) -> Result<(), Self::Error>;

  /// Sends `bytes` to `dest`. Returns `Err(nb::Error::WouldBlock)` if the
  /// send cannot complete without blocking; the caller retries on a later
  /// tick.
  fn send(&mut self, dest: SocketAddr, bytes: &[u8]) -> nb::Result<(), Self::Error>;

  /// Reads one datagram into `buf`, returning its length and sender address.
  /// Returns `Err(nb::Error::WouldBlock)` if no datagram is pending.
  fn recv(&mut self, buf: &mut [u8]) -> nb::Result<(usize, SocketAddr), Self::Error>;

  /// Convenience wrapper over `recv` that folds `WouldBlock` into `None`,
  /// for callers (like `tick_rx`) that just want "is anything here".
  fn poll_recv(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, Self::Error> {
    match self.recv(buf) {
      | Ok(datagram) => Ok(Some(datagram)),
      | Err(nb::Error::WouldBlock) => Ok(None),
      | Err(nb::Error::Other(e)) => Err(e),
    }
  }
}
