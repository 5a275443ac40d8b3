use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode message: {0}")]
    Encode(bincode::Error),
    #[error("failed to decode message: {0}")]
    Decode(bincode::Error),
    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("connection closed by peer")]
    ConnectionClosed,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },
    #[error("invalid roster in message: {0}")]
    Roster(#[from] corelib::Error),
}
