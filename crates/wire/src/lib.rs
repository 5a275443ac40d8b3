//! TCP wire protocol between clients and replica nodes.
//!
//! This crate provides:
//! - The tagged request/response envelope (`protocol`)
//! - Length-prefixed bincode framing (`codec`)
//! - Outbound calls with bounded timeouts, including the production
//!   `PeerClient` (`sender`)
//! - The accept loop and per-connection dispatch (`receiver`, `router`)

pub mod codec;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod router;
pub mod sender;

pub use codec::{MAX_ENVELOPE_SIZE, MAX_VALUE_LEN};
pub use error::WireError;
pub use protocol::{Message, MessageType, PutRequest, ReplicaInfo, Response};
pub use receiver::{RequestHandler, RequestReceiver, Responder};
pub use router::Router;
pub use sender::{request, send, TcpPeerClient, DEFAULT_PEER_TIMEOUT};
