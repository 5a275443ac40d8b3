//! Dispatch of decoded requests onto a replica node.

use std::sync::Arc;

use async_trait::async_trait;
use corelib::Key;
use replication::{ConsistencyLevel, PeerClient, ReplicaNode, ReplicationError};
use tokio::sync::oneshot;

use crate::codec::MAX_VALUE_LEN;
use crate::protocol::{Message, PutRequest, ReplicaInfo, Response};
use crate::receiver::{RequestHandler, Responder};

pub const MSG_STORED: &str = "key-value pair stored";
pub const MSG_RETRIEVED: &str = "value retrieved";
pub const MSG_NOT_FOUND: &str = "unable to locate the key-value pair";
pub const MSG_NOT_ENOUGH_REPLICAS: &str = "not enough replicas are up";

/// Routes each request kind to the matching `ReplicaNode` operation.
pub struct Router<P: PeerClient> {
    node: Arc<ReplicaNode<P>>,
}

impl<P: PeerClient> Router<P> {
    pub fn new(node: Arc<ReplicaNode<P>>) -> Self {
        Self { node }
    }

    fn on_init(&self, replicas: Vec<ReplicaInfo>) {
        let roster = match ReplicaInfo::to_roster(&replicas) {
            Ok(roster) => roster,
            Err(err) => {
                tracing::error!(error = %err, "rejecting init with invalid roster");
                return;
            }
        };
        match self.node.initialize(roster) {
            Ok(()) => tracing::info!(node = %self.node.local(), "initialized from peer message"),
            Err(err) => tracing::warn!(node = %self.node.local(), error = %err, "init rejected"),
        }
    }

    /// Admission for client requests: key range, readiness, liveness.
    async fn admit(
        &self,
        raw_key: u32,
        consistency: ConsistencyLevel,
    ) -> Result<Key, Response> {
        let key = Key::try_from(raw_key).map_err(|err| reject(raw_key, err.to_string()))?;
        match self.node.check_replica_status(key, consistency).await {
            Ok(true) => Ok(key),
            Ok(false) => Err(reject(raw_key, MSG_NOT_ENOUGH_REPLICAS)),
            Err(err) => Err(reject(raw_key, err.to_string())),
        }
    }

    async fn on_client_put(&self, request: PutRequest, responder: Responder) {
        metrics::counter!("kv_client_puts_total").increment(1);
        let raw_key = request.key;

        if request.value.len() > MAX_VALUE_LEN {
            let reason = format!(
                "value of {} bytes exceeds the {} byte limit",
                request.value.len(),
                MAX_VALUE_LEN
            );
            reply(responder, reject(raw_key, reason)).await;
            return;
        }
        if let Ok(key) = Key::try_from(raw_key) {
            if let Err(err) = self.node.check_write(key, &request.value) {
                reply(responder, reject(raw_key, err.to_string())).await;
                return;
            }
        }
        let key = match self.admit(raw_key, request.consistency).await {
            Ok(key) => key,
            Err(response) => {
                reply(responder, response).await;
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        let node = Arc::clone(&self.node);
        let value = request.value.clone();
        let consistency = request.consistency;
        // Owners past the consistency level keep receiving the write after
        // the client has its answer.
        tokio::spawn(async move {
            if let Err(err) = node.coordinate_write(key, value, consistency, tx).await {
                tracing::warn!(key = %key, error = %err, "client write failed");
            }
        });

        match rx.await {
            Ok(ack) => {
                let response = Response::success(raw_key, MSG_STORED)
                    .with_value(request.value, ack.timestamp)
                    .with_origin(self.node.local());
                reply(responder, response).await;
            }
            Err(_) => tracing::warn!(
                key = %key,
                consistency = %consistency,
                peer = %responder.peer(),
                "write not acknowledged, closing without reply"
            ),
        }
    }

    async fn on_client_read(&self, raw_key: u32, consistency: ConsistencyLevel, responder: Responder) {
        metrics::counter!("kv_client_reads_total").increment(1);
        let key = match self.admit(raw_key, consistency).await {
            Ok(key) => key,
            Err(response) => {
                reply(responder, response).await;
                return;
            }
        };

        let outcome = match self.node.coordinate_read(key).await {
            Ok(outcome) => outcome,
            Err(err) => {
                reply(responder, reject(raw_key, err.to_string())).await;
                return;
            }
        };

        let response = match &outcome.winner {
            Some(winner) => Response::success(raw_key, MSG_RETRIEVED)
                .with_value(winner.value.clone(), winner.timestamp)
                .with_origin(&winner.replica),
            None => Response::failure(raw_key, MSG_NOT_FOUND),
        };
        reply(responder, response).await;

        if self.node.recovery() == replication::RecoveryMode::ReadRepair {
            self.node.read_repair(&outcome).await;
        }
    }

    async fn on_replica_put(&self, request: PutRequest) {
        let write = match request.into_write() {
            Ok(write) => write,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed replica put");
                return;
            }
        };
        match self.node.accept_replica_write(write).await {
            Ok(_) => {}
            Err(ReplicationError::NotInitialized) => {
                tracing::warn!(node = %self.node.local(), "replica put before init, dropped")
            }
            // Already logged by the node.
            Err(_) => {}
        }
    }

    async fn on_replica_read(&self, raw_key: u32, responder: Responder) {
        let response = match Key::try_from(raw_key)
            .map_err(ReplicationError::from)
            .and_then(|key| self.node.local_reply(key))
        {
            Ok(local) => Response::success(raw_key, format!("{} success", local.origin))
                .with_value(local.value, local.timestamp)
                .with_origin(&local.origin),
            Err(err) => reject(raw_key, err.to_string()),
        };
        reply(responder, response).await;
    }
}

fn reject(key: u32, message: impl Into<String>) -> Response {
    metrics::counter!("kv_admission_rejections_total").increment(1);
    Response::failure(key, message)
}

async fn reply(responder: Responder, response: Response) {
    let peer = responder.peer();
    if let Err(err) = responder.send(&Message::Response(response)).await {
        tracing::warn!(%peer, error = %err, "failed to send response");
    }
}

#[async_trait]
impl<P: PeerClient> RequestHandler for Router<P> {
    async fn handle(&self, message: Message, responder: Responder) {
        match message {
            Message::InitReplicaCluster { replicas } => self.on_init(replicas),
            Message::ClientPut(request) => self.on_client_put(request, responder).await,
            Message::ClientRead { key, consistency } => {
                self.on_client_read(key, consistency, responder).await
            }
            Message::ReplicaPut(request) => self.on_replica_put(request).await,
            Message::ReplicaRead { key } => self.on_replica_read(key, responder).await,
            Message::Response(_) => {
                tracing::warn!(peer = %responder.peer(), "unsolicited response, dropped")
            }
        }
    }
}
