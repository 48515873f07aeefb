//! Broadcast transports
//!
//! Best-effort snapshot broadcast with no delivery guarantee. Two
//! transports share one enum: an in-process loopback bus for tests and
//! multi-node simulation in a single process, and UDP datagrams for
//! separate processes. Receives are bounded by a timeout window; a cycle
//! that hears nothing proceeds with local state.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};

/// Largest accepted datagram / bus message.
const MAX_MESSAGE_BYTES: usize = 65_536;

/// In-process broadcast bus that peers join.
#[derive(Debug, Clone)]
pub struct LoopbackBus {
    sender: broadcast::Sender<Vec<u8>>,
}

impl LoopbackBus {
    /// Create a bus with the given backlog capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Join the bus as a peer.
    pub fn join(&self) -> PeerLink {
        PeerLink::Loopback {
            tx: self.sender.clone(),
            rx: self.sender.subscribe(),
        }
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// A peer's broadcast link.
///
/// Loopback receivers also hear their own broadcasts; callers filter by
/// envelope origin.
#[derive(Debug)]
pub enum PeerLink {
    /// In-process fan-out over a broadcast channel
    Loopback {
        /// Shared bus sender
        tx: broadcast::Sender<Vec<u8>>,
        /// This peer's subscription
        rx: broadcast::Receiver<Vec<u8>>,
    },
    /// UDP datagrams to a fixed peer list
    Udp {
        /// Bound local socket
        socket: UdpSocket,
        /// Destination peers
        peers: Vec<SocketAddr>,
    },
}

impl PeerLink {
    /// Bind a UDP link and record its peer list.
    pub async fn udp(bind_addr: &str, peers: Vec<SocketAddr>) -> Result<Self> {
        let socket = UdpSocket::bind(bind_addr).await?;
        debug!(local = %socket.local_addr()?, peers = peers.len(), "udp link bound");
        Ok(PeerLink::Udp { socket, peers })
    }

    /// The local address of a UDP link (loopback links have none).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            PeerLink::Loopback { .. } => None,
            PeerLink::Udp { socket, .. } => socket.local_addr().ok(),
        }
    }

    /// Broadcast a message to all peers, fire-and-forget.
    ///
    /// Individual send failures are logged and swallowed; broadcast
    /// semantics promise no delivery.
    pub async fn broadcast(&self, bytes: &[u8]) -> Result<()> {
        match self {
            PeerLink::Loopback { tx, .. } => {
                // A send with no live receivers is still best-effort success
                let _ = tx.send(bytes.to_vec());
                Ok(())
            }
            PeerLink::Udp { socket, peers } => {
                for peer in peers {
                    if let Err(err) = socket.send_to(bytes, peer).await {
                        warn!(%peer, %err, "broadcast send failed");
                    }
                }
                Ok(())
            }
        }
    }

    /// Receive one message within a bounded window.
    ///
    /// Returns `Timeout` when the window elapses with nothing heard so
    /// the cycle can proceed with locally known state.
    pub async fn recv(&mut self, window_ms: u64) -> Result<Vec<u8>> {
        let window = Duration::from_millis(window_ms);
        match self {
            PeerLink::Loopback { rx, .. } => loop {
                match tokio::time::timeout(window, rx.recv()).await {
                    Ok(Ok(bytes)) => return Ok(bytes),
                    Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        warn!(skipped, "loopback receiver lagged; messages dropped");
                        continue;
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        return Err(SyncError::ChannelClosed);
                    }
                    Err(_) => return Err(SyncError::Timeout { window_ms }),
                }
            },
            PeerLink::Udp { socket, .. } => {
                let mut buf = vec![0u8; MAX_MESSAGE_BYTES];
                match tokio::time::timeout(window, socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, _from))) => {
                        buf.truncate(len);
                        Ok(buf)
                    }
                    Ok(Err(err)) => Err(SyncError::Io(err)),
                    Err(_) => Err(SyncError::Timeout { window_ms }),
                }
            }
        }
    }
}
