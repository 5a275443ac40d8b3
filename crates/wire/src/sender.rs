//! Outbound connections. Every dial, write and read is bounded by a timeout.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use corelib::{Key, Node, NodeId};
use replication::{PeerClient, PeerError, ReplicaReadReply, ReplicaWrite};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::codec::{read_message, write_message};
use crate::error::WireError;
use crate::protocol::{Message, PutRequest};

pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_millis(2000);

pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, WireError>
where
    F: Future<Output = Result<T, WireError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| WireError::Timeout(limit))?
}

async fn connect(addr: SocketAddr, limit: Duration) -> Result<TcpStream, WireError> {
    bounded(limit, async { TcpStream::connect(addr).await.map_err(WireError::from) }).await
}

/// Open a connection, write `message` and close the write side. No reply
/// is awaited.
pub async fn send(addr: SocketAddr, message: &Message, limit: Duration) -> Result<(), WireError> {
    let mut stream = connect(addr, limit).await?;
    bounded(limit, async {
        write_message(&mut stream, message).await?;
        stream.shutdown().await?;
        Ok::<(), WireError>(())
    })
    .await
}

/// Open a connection, write `message` and wait for one reply.
pub async fn request(
    addr: SocketAddr,
    message: &Message,
    limit: Duration,
) -> Result<Message, WireError> {
    let mut stream = connect(addr, limit).await?;
    bounded(limit, write_message(&mut stream, message)).await?;
    bounded(limit, read_message(&mut stream)).await
}

/// `PeerClient` over TCP, one connection per call.
#[derive(Debug, Clone)]
pub struct TcpPeerClient {
    timeout: Duration,
}

impl Default for TcpPeerClient {
    fn default() -> Self {
        Self::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl TcpPeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn peer_error(target: &Node, err: WireError) -> PeerError {
    let id = target.id.clone();
    match err {
        WireError::Timeout(_) => PeerError::Timeout(id),
        WireError::Io(e) => PeerError::Unreachable(id, e.to_string()),
        WireError::ConnectionClosed => PeerError::Unreachable(id, "connection closed".into()),
        other => PeerError::Protocol(id, other.to_string()),
    }
}

#[async_trait]
impl PeerClient for TcpPeerClient {
    async fn replica_put(&self, target: &Node, write: &ReplicaWrite) -> Result<(), PeerError> {
        let message = Message::ReplicaPut(PutRequest::from(write));
        send(target.addr, &message, self.timeout)
            .await
            .map_err(|e| peer_error(target, e))
    }

    async fn replica_read(&self, target: &Node, key: Key) -> Result<ReplicaReadReply, PeerError> {
        let message = Message::ReplicaRead { key: u32::from(key) };
        let reply = request(target.addr, &message, self.timeout)
            .await
            .map_err(|e| peer_error(target, e))?;

        let kind = reply.kind();
        let response = reply.into_response().ok_or_else(|| {
            peer_error(
                target,
                WireError::UnexpectedReply {
                    expected: "response",
                    got: kind.as_str(),
                },
            )
        })?;
        if !response.status {
            return Err(PeerError::Rejected(target.id.clone(), response.message));
        }
        let origin = if response.origin_replica.is_empty() {
            target.id.clone()
        } else {
            NodeId::new(response.origin_replica)
        };
        Ok(ReplicaReadReply {
            key,
            value: response.value,
            timestamp: response.arrival,
            origin,
        })
    }

    async fn probe(&self, target: &Node) -> Result<(), PeerError> {
        let stream = connect(target.addr, self.timeout)
            .await
            .map_err(|e| peer_error(target, e))?;
        drop(stream);
        Ok(())
    }
}
