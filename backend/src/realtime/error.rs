use thiserror::Error;

use super::registry::ConnectionId;

/// Recoverable registry and membership failures. Callers log them and carry on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("connection {0} not found")]
    NotFound(ConnectionId),
}

/// Failure to hand an event to a single connection's transport.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,

    #[error("outbound queue full")]
    Full,
}
