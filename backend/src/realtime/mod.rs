//! Realtime notification fan-out: connection registry, per-connection
//! membership sessions, the publish gateway and the WebSocket transport.

pub mod error;
pub mod gateway;
pub mod registry;
pub mod session;
pub mod ws;

pub use error::{DeliveryError, RealtimeError};
pub use gateway::PublishGateway;
pub use registry::{ConnectionId, ConnectionRegistry, EventSink, Member};
pub use session::{DisconnectReason, Session, SessionState};

use std::sync::Arc;

/// Unregisters every connection still in the registry. Used once the
/// listener has stopped; returns how many connections were dropped.
pub fn drain(registry: &Arc<ConnectionRegistry>, reason: &DisconnectReason) -> usize {
    let mut dropped = 0;
    for id in registry.connection_ids() {
        // A socket task may win the race and unregister first.
        if registry.unregister(&id).is_ok() {
            dropped += 1;
            tracing::debug!(connection = %id, %reason, "Connection drained");
        }
    }
    dropped
}
