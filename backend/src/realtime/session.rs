//! Per-connection membership protocol.
//!
//! A `Session` is created when the transport reports a new connection and
//! moves from `Connected` to `Disconnected` exactly once. Client control
//! messages are dispatched to it one at a time.

use std::fmt;
use std::sync::Arc;

use common::{ClientMessage, DASHBOARD_CHANNEL};

use super::error::RealtimeError;
use super::registry::{ConnectionId, ConnectionRegistry, EventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

/// Why the transport dropped a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientClosed,
    TransportError(String),
    ServerShutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed => f.write_str("client closed"),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {e}"),
            DisconnectReason::ServerShutdown => f.write_str("server shutdown"),
        }
    }
}

pub struct Session {
    id: ConnectionId,
    state: SessionState,
    registry: Arc<ConnectionRegistry>,
}

impl Session {
    /// Registers a freshly established connection.
    pub fn connect(
        registry: Arc<ConnectionRegistry>,
        id: impl Into<ConnectionId>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, RealtimeError> {
        let id = id.into();
        registry.register(id.clone(), sink)?;
        tracing::debug!(connection = %id, "session registered");
        Ok(Self {
            id,
            state: SessionState::Connected,
            registry,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Applies one client control message.
    pub fn handle(&mut self, message: ClientMessage) -> Result<(), RealtimeError> {
        match message {
            ClientMessage::JoinDashboard => self.join(DASHBOARD_CHANNEL),
            ClientMessage::LeaveDashboard => self.leave(DASHBOARD_CHANNEL),
        }
    }

    pub fn join(&mut self, channel: &str) -> Result<(), RealtimeError> {
        if self.state == SessionState::Disconnected {
            return Err(RealtimeError::UnknownConnection(self.id.clone()));
        }
        self.registry.join(&self.id, channel)?;
        tracing::info!(connection = %self.id, channel, "joined channel");
        Ok(())
    }

    pub fn leave(&mut self, channel: &str) -> Result<(), RealtimeError> {
        if self.state == SessionState::Disconnected {
            return Err(RealtimeError::UnknownConnection(self.id.clone()));
        }
        if self.registry.leave(&self.id, channel) {
            tracing::info!(connection = %self.id, channel, "left channel");
        }
        Ok(())
    }

    /// Removes the connection from every channel. Calling it again is a no-op.
    ///
    /// Returns `NotFound` if the registry already dropped the connection,
    /// e.g. when shutdown drained it first; the session still ends up
    /// `Disconnected`.
    pub fn disconnect(&mut self, reason: &DisconnectReason) -> Result<(), RealtimeError> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        self.state = SessionState::Disconnected;
        let left = self.registry.unregister(&self.id)?;
        tracing::debug!(connection = %self.id, %reason, channels = ?left, "session unregistered");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state == SessionState::Connected {
            let _ = self.disconnect(&DisconnectReason::TransportError("session dropped".into()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::registry::tests::RecordingSink;

    fn open(registry: &Arc<ConnectionRegistry>, id: &str) -> Session {
        Session::connect(Arc::clone(registry), id, Arc::new(RecordingSink::default())).unwrap()
    }

    #[test]
    fn control_messages_map_to_dashboard_membership() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut session = open(&registry, "a");
        assert!(!registry.is_member("a", DASHBOARD_CHANNEL));

        session.handle(ClientMessage::JoinDashboard).unwrap();
        assert!(registry.is_member("a", DASHBOARD_CHANNEL));

        session.handle(ClientMessage::LeaveDashboard).unwrap();
        assert!(!registry.is_member("a", DASHBOARD_CHANNEL));

        // Leaving again is silent.
        session.handle(ClientMessage::LeaveDashboard).unwrap();
    }

    #[test]
    fn duplicate_connect_fails() {
        let registry = Arc::new(ConnectionRegistry::new());
        let _first = open(&registry, "a");
        let second = Session::connect(
            Arc::clone(&registry),
            "a",
            Arc::new(RecordingSink::default()),
        );
        assert!(matches!(second, Err(RealtimeError::DuplicateConnection(_))));
    }

    #[test]
    fn disconnected_session_rejects_control_messages() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut session = open(&registry, "a");
        session.handle(ClientMessage::JoinDashboard).unwrap();

        session.disconnect(&DisconnectReason::ClientClosed).unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!registry.contains("a"));
        assert_eq!(registry.member_count(DASHBOARD_CHANNEL), 0);

        assert_eq!(
            session.handle(ClientMessage::JoinDashboard),
            Err(RealtimeError::UnknownConnection("a".into()))
        );
        // Second disconnect is a no-op.
        assert_eq!(session.disconnect(&DisconnectReason::ClientClosed), Ok(()));
    }

    #[test]
    fn disconnect_after_registry_drain_reports_not_found() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut session = open(&registry, "a");
        registry.unregister("a").unwrap();

        assert_eq!(
            session.disconnect(&DisconnectReason::ServerShutdown),
            Err(RealtimeError::NotFound("a".into()))
        );
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn dropping_a_session_unregisters_it() {
        let registry = Arc::new(ConnectionRegistry::new());
        {
            let mut session = open(&registry, "a");
            session.handle(ClientMessage::JoinDashboard).unwrap();
        }
        assert!(!registry.contains("a"));
        assert!(!registry.is_member("a", DASHBOARD_CHANNEL));
    }

    #[test]
    fn disconnect_reason_display() {
        assert_eq!(DisconnectReason::ClientClosed.to_string(), "client closed");
        assert_eq!(
            DisconnectReason::TransportError("reset".into()).to_string(),
            "transport error: reset"
        );
    }
}
