//! Message envelope exchanged over a single TCP connection.
//!
//! Each connection carries exactly one request and at most one reply. The
//! variant of [`Message`] selects the handler on the receiving node.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use corelib::{Key, Node, NodeId, Roster};
use replication::{ConsistencyLevel, ReplicaWrite};
use serde::{Deserialize, Serialize};

/// One roster entry as carried by an init message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    pub name: String,
    pub ip: String,
    pub port: u16,
}

impl From<&Node> for ReplicaInfo {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name().to_string(),
            ip: node.addr.ip().to_string(),
            port: node.addr.port(),
        }
    }
}

impl ReplicaInfo {
    pub fn from_roster(roster: &Roster) -> Vec<ReplicaInfo> {
        roster.members().iter().map(ReplicaInfo::from).collect()
    }

    /// Rebuild an ordered roster from init-message entries. Addresses must
    /// be IP literals; nothing is resolved.
    pub fn to_roster(replicas: &[ReplicaInfo]) -> corelib::Result<Roster> {
        let members = replicas
            .iter()
            .enumerate()
            .map(|(idx, info)| {
                let ip: IpAddr = info.ip.parse().map_err(|_| corelib::Error::RosterParse {
                    line: idx + 1,
                    reason: format!("{:?} is not an IP address", info.ip),
                })?;
                Ok(Node::new(info.name.as_str(), SocketAddr::new(ip, info.port)))
            })
            .collect::<corelib::Result<Vec<_>>>()?;
        Roster::new(members)
    }
}

/// Write payload shared by client-put and replica-put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: u32,
    pub value: String,
    pub consistency: ConsistencyLevel,
    /// Sender of a replica-put; empty on client requests.
    pub origin_replica: String,
    /// Seconds timestamp; set by the coordinator, 0 on client requests.
    pub timestamp: i64,
}

impl PutRequest {
    pub fn client(key: u32, value: impl Into<String>, consistency: ConsistencyLevel) -> Self {
        Self {
            key,
            value: value.into(),
            consistency,
            origin_replica: String::new(),
            timestamp: 0,
        }
    }

    /// Domain form of a replica-put. Fails on keys outside the domain.
    pub fn into_write(self) -> corelib::Result<ReplicaWrite> {
        Ok(ReplicaWrite {
            key: Key::try_from(self.key)?,
            value: self.value,
            timestamp: self.timestamp,
            origin: NodeId::new(self.origin_replica),
            consistency: self.consistency,
        })
    }
}

impl From<&ReplicaWrite> for PutRequest {
    fn from(write: &ReplicaWrite) -> Self {
        Self {
            key: u32::from(write.key),
            value: write.value.clone(),
            consistency: write.consistency,
            origin_replica: write.origin.to_string(),
            timestamp: write.timestamp,
        }
    }
}

/// Reply to a client request or a replica-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub key: u32,
    pub value: String,
    /// Timestamp of the returned value.
    pub arrival: i64,
    pub origin_replica: String,
    pub status: bool,
    pub message: String,
}

impl Response {
    pub fn success(key: u32, message: impl Into<String>) -> Self {
        Self {
            key,
            value: String::new(),
            arrival: 0,
            origin_replica: String::new(),
            status: true,
            message: message.into(),
        }
    }

    pub fn failure(key: u32, message: impl Into<String>) -> Self {
        Self {
            status: false,
            ..Self::success(key, message)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>, arrival: i64) -> Self {
        self.value = value.into();
        self.arrival = arrival;
        self
    }

    pub fn with_origin(mut self, origin: &NodeId) -> Self {
        self.origin_replica = origin.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    InitReplicaCluster { replicas: Vec<ReplicaInfo> },
    ClientPut(PutRequest),
    ClientRead { key: u32, consistency: ConsistencyLevel },
    ReplicaPut(PutRequest),
    ReplicaRead { key: u32 },
    Response(Response),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    InitReplicaCluster,
    ClientPut,
    ClientRead,
    ReplicaPut,
    ReplicaRead,
    Response,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::InitReplicaCluster => "init",
            MessageType::ClientPut => "client-put",
            MessageType::ClientRead => "client-read",
            MessageType::ReplicaPut => "replica-put",
            MessageType::ReplicaRead => "replica-read",
            MessageType::Response => "response",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Message::InitReplicaCluster { .. } => MessageType::InitReplicaCluster,
            Message::ClientPut(_) => MessageType::ClientPut,
            Message::ClientRead { .. } => MessageType::ClientRead,
            Message::ReplicaPut(_) => MessageType::ReplicaPut,
            Message::ReplicaRead { .. } => MessageType::ReplicaRead,
            Message::Response(_) => MessageType::Response,
        }
    }

    pub fn init(roster: &Roster) -> Self {
        Message::InitReplicaCluster {
            replicas: ReplicaInfo::from_roster(roster),
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Message::Response(response) => Some(response),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_round_trips_through_init() {
        let roster = Roster::parse("A 127.0.0.1 9001\nB 127.0.0.1 9002\nC 10.0.0.3 9003\n").unwrap();
        let Message::InitReplicaCluster { replicas } = Message::init(&roster) else {
            panic!("expected init message");
        };
        assert_eq!(replicas[2].ip, "10.0.0.3");
        assert_eq!(ReplicaInfo::to_roster(&replicas).unwrap(), roster);
    }

    #[test]
    fn test_bad_replica_address_rejected() {
        let replicas = vec![ReplicaInfo {
            name: "A".into(),
            ip: "not a host".into(),
            port: 1,
        }];
        assert!(ReplicaInfo::to_roster(&replicas).is_err());
    }

    #[test]
    fn test_init_hostnames_are_not_resolved() {
        let replicas = vec![
            ReplicaInfo {
                name: "A".into(),
                ip: "::1".into(),
                port: 9001,
            },
            ReplicaInfo {
                name: "B".into(),
                ip: "localhost".into(),
                port: 9002,
            },
        ];
        let err = ReplicaInfo::to_roster(&replicas).unwrap_err();
        assert!(matches!(err, corelib::Error::RosterParse { line: 2, .. }));
    }

    #[test]
    fn test_put_request_key_range() {
        let request = PutRequest::client(256, "x", ConsistencyLevel::One);
        assert!(matches!(
            request.into_write(),
            Err(corelib::Error::InvalidKey(256))
        ));
    }

    #[test]
    fn test_failure_response() {
        let response = Response::failure(3, "nope");
        assert!(!response.status);
        assert_eq!(response.key, 3);
        assert!(response.value.is_empty());
    }
}
