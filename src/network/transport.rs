//! UDP transport for the wallbox link
//!
//! Handles only datagrams and timing; the protocol layer decides what the
//! bytes mean. One socket, one remote peer, at most one command in flight.

use std::io;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time;

use crate::protocol::{MAX_RESPONSE_SIZE, RESPONSE_TIMEOUT};

/// Connected UDP socket bound to the wallbox endpoint
///
/// The socket is associated with the remote peer, so only its datagrams are
/// delivered. It is closed exactly once when the transport is dropped.
pub struct UdpTransport {
    socket: UdpSocket,
    remote_addr: SocketAddr,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind `0.0.0.0:{local_port}` and associate the socket with the wallbox
    ///
    /// Production clients bind the well-known local port; tests pass 0 for
    /// an ephemeral one. Fails if the port is taken or the peer address
    /// cannot be associated.
    pub async fn bind(remote_addr: SocketAddr, local_port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", local_port)).await?;
        socket.connect(remote_addr).await?;

        Ok(Self {
            socket,
            remote_addr,
            recv_buf: vec![0u8; MAX_RESPONSE_SIZE],
        })
    }

    /// Get the remote wallbox address
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Get the local address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// One command round-trip
    ///
    /// Drains a stale datagram if one is queued, sends the command, then
    /// waits up to [`RESPONSE_TIMEOUT`] for the reply. Returns `None` when
    /// the timeout elapses with nothing received. Replies longer than
    /// [`MAX_RESPONSE_SIZE`] are truncated by the receive call.
    ///
    /// At most one stale datagram is drained per exchange. The device is
    /// trusted to answer each command with at most one datagram, so a
    /// single queued leftover is the worst case a well-behaved peer can
    /// produce between sequential commands.
    pub async fn exchange(&mut self, command: &str) -> io::Result<Option<Bytes>> {
        if let Some(stale) = self.try_drain()? {
            tracing::warn!(
                bytes = stale.len(),
                dump = ?stale,
                "Found unexpected data in receive queue, discarding"
            );
        }

        tracing::info!(%command, "Sending command");
        self.socket.send(command.as_bytes()).await?;

        match time::timeout(RESPONSE_TIMEOUT, self.socket.recv(&mut self.recv_buf)).await {
            Ok(Ok(len)) => Ok(Some(Bytes::copy_from_slice(&self.recv_buf[..len]))),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::error!(
                    %command,
                    timeout = ?RESPONSE_TIMEOUT,
                    "No response within timeout"
                );
                Ok(None)
            }
        }
    }

    /// Non-blocking check for an already-queued datagram
    fn try_drain(&mut self) -> io::Result<Option<Bytes>> {
        match self.socket.try_recv(&mut self.recv_buf) {
            Ok(len) => Ok(Some(Bytes::copy_from_slice(&self.recv_buf[..len]))),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.socket.local_addr().ok())
            .finish()
    }
}
