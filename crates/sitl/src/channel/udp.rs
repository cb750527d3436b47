//! UDP endpoint bound to the local FDM port.

use std::io;
use std::net::SocketAddr;
use std::os::fd::AsFd;
use std::time::Duration;

use async_trait::async_trait;
use rustix::io::Errno;
use rustix::net::{AddressFamily, RecvFlags, SocketType};
use tokio::net::UdpSocket;

use super::DatagramChannel;
use crate::error::SimulatorError;

/// UDP socket receiving FDM packets, with the Gazebo peer it sends to.
///
/// The peer is configured, never negotiated: every send goes to the address
/// given at construction and datagrams are accepted from any source.
pub struct UdpEndpoint {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpEndpoint {
    /// Bind `local` with `SO_REUSEADDR`, switch to non-blocking mode and
    /// record `peer` for all subsequent sends.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::BindFailed`] if the port cannot be bound.
    pub fn configure(local: SocketAddr, peer: SocketAddr) -> Result<Self, SimulatorError> {
        let std_socket =
            bind_reusable(local).map_err(|source| SimulatorError::BindFailed { addr: local, source })?;
        let socket = UdpSocket::from_std(std_socket)?;
        tracing::info!(%local, %peer, "FDM endpoint bound");
        Ok(Self { socket, peer })
    }

    /// Local address the endpoint is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Address servo packets are sent to.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

fn bind_reusable(local: SocketAddr) -> io::Result<std::net::UdpSocket> {
    let family = if local.is_ipv4() {
        AddressFamily::INET
    } else {
        AddressFamily::INET6
    };
    let fd = rustix::net::socket(family, SocketType::DGRAM, None)?;
    rustix::net::sockopt::set_socket_reuseaddr(&fd, true)?;
    rustix::net::bind(&fd, &local)?;

    let socket = std::net::UdpSocket::from(fd);
    socket.set_nonblocking(true)?;
    Ok(socket)
}

impl std::fmt::Debug for UdpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpEndpoint")
            .field("local", &self.socket.local_addr().ok())
            .field("peer", &self.peer)
            .finish()
    }
}

#[async_trait]
impl DatagramChannel for UdpEndpoint {
    async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.peer).await
    }

    async fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<usize>> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(Ok((len, _from))) => Ok(Some(len)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        // Straight to the kernel: tokio's cached readiness may be stale here.
        match rustix::net::recv(self.socket.as_fd(), buf, RecvFlags::DONTWAIT) {
            Ok(len) => Ok(Some(len)),
            Err(e) if e == Errno::WOULDBLOCK => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_configure_binds_ephemeral_port() {
        let endpoint = UdpEndpoint::configure(localhost(0), localhost(9002)).unwrap();
        let addr = endpoint.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert_eq!(endpoint.peer(), localhost(9002));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        // Holder without SO_REUSEADDR keeps the port exclusive.
        let holder = std::net::UdpSocket::bind(localhost(0)).unwrap();
        let taken = holder.local_addr().unwrap();

        match UdpEndpoint::configure(taken, localhost(9002)) {
            Err(SimulatorError::BindFailed { addr, .. }) => assert_eq!(addr, taken),
            other => panic!("Expected BindFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reusable_port_binds_twice() {
        let first = UdpEndpoint::configure(localhost(0), localhost(9002)).unwrap();
        let port = first.local_addr().unwrap();

        let second = UdpEndpoint::configure(port, localhost(9002)).unwrap();
        assert_eq!(second.local_addr().unwrap(), port);
    }

    #[tokio::test]
    async fn test_try_recv_empty_returns_none() {
        let mut endpoint = UdpEndpoint::configure(localhost(0), localhost(9002)).unwrap();
        let mut buf = [0u8; 64];
        assert!(endpoint.try_recv(&mut buf).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recv_timeout_expires() {
        let mut endpoint = UdpEndpoint::configure(localhost(0), localhost(9002)).unwrap();
        let mut buf = [0u8; 64];
        let got = endpoint
            .recv_timeout(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        let peer = std::net::UdpSocket::bind(localhost(0)).unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        let mut endpoint =
            UdpEndpoint::configure(localhost(0), peer.local_addr().unwrap()).unwrap();

        endpoint.send(b"servo").await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"servo");
        assert_eq!(from.port(), endpoint.local_addr().unwrap().port());
    }
}
