//! Datagram transport between the bridge and the physics engine.

pub mod udp;

use std::io;
use std::time::Duration;

use async_trait::async_trait;

pub use udp::UdpEndpoint;

/// Unreliable datagram channel to a single, preconfigured peer.
///
/// The bridge only needs three primitives: fire-and-forget send, a receive
/// with a bounded wait, and a receive that never waits. Implementations
/// must be `Send` so a bridge can move between tasks.
#[async_trait]
pub trait DatagramChannel: Send {
    /// Send one datagram to the peer.
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Wait up to `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    async fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration)
        -> io::Result<Option<usize>>;

    /// Receive one datagram if one is already queued.
    ///
    /// Returns `Ok(None)` when the channel is empty.
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}
