//! Connection registry: which live connections exist and which channels each
//! of them has joined.
//!
//! All state sits behind one `RwLock`. Mutations (register, unregister, join,
//! leave) take the write half, so a disconnect removes a connection from every
//! channel in a single step and no reader can observe it half-removed.
//! Readers only ever copy out what they need; delivery happens after the lock
//! is released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use common::ServerEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::error::{DeliveryError, RealtimeError};

/// Opaque, per-session unique connection identifier.
pub type ConnectionId = String;

/// Transport half of a connection as seen by the registry.
///
/// `deliver` must not block: it either queues the event or reports why it
/// could not.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryError>;
}

impl EventSink for mpsc::Sender<Arc<ServerEvent>> {
    fn deliver(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryError> {
        self.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// A channel member copied out of the registry for delivery.
#[derive(Clone)]
pub struct Member {
    pub id: ConnectionId,
    sink: Arc<dyn EventSink>,
}

impl Member {
    pub fn deliver(&self, event: Arc<ServerEvent>) -> Result<(), DeliveryError> {
        self.sink.deliver(event)
    }
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member").field("id", &self.id).finish()
    }
}

struct ConnectionEntry {
    sink: Arc<dyn EventSink>,
    channels: HashSet<String>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// channel name -> member ids. Channels are created on first join and
    /// kept around once empty.
    channels: HashMap<String, HashSet<ConnectionId>>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection with no channel memberships.
    pub fn register(
        &self,
        id: impl Into<ConnectionId>,
        sink: Arc<dyn EventSink>,
    ) -> Result<(), RealtimeError> {
        let id = id.into();
        let mut inner = self.inner.write();
        if inner.connections.contains_key(&id) {
            return Err(RealtimeError::DuplicateConnection(id));
        }
        inner.connections.insert(
            id,
            ConnectionEntry {
                sink,
                channels: HashSet::new(),
            },
        );
        Ok(())
    }

    /// Removes the connection from every channel it joined and drops its
    /// record. Returns the channels it was removed from.
    pub fn unregister(&self, id: &str) -> Result<Vec<String>, RealtimeError> {
        let mut inner = self.inner.write();
        let entry = inner
            .connections
            .remove(id)
            .ok_or_else(|| RealtimeError::NotFound(id.to_string()))?;

        let mut left: Vec<String> = entry.channels.into_iter().collect();
        for channel in &left {
            if let Some(members) = inner.channels.get_mut(channel) {
                members.remove(id);
            }
        }
        left.sort();
        Ok(left)
    }

    /// Adds the connection to `channel`, creating the channel if needed.
    /// Joining twice is the same as joining once.
    pub fn join(&self, id: &str, channel: &str) -> Result<(), RealtimeError> {
        let mut inner = self.inner.write();
        let RegistryInner {
            connections,
            channels,
        } = &mut *inner;

        let entry = connections
            .get_mut(id)
            .ok_or_else(|| RealtimeError::UnknownConnection(id.to_string()))?;
        entry.channels.insert(channel.to_string());
        channels
            .entry(channel.to_string())
            .or_default()
            .insert(id.to_string());
        Ok(())
    }

    /// Removes the connection from `channel`. Returns whether it was a member;
    /// leaving a channel that was never joined is not an error.
    pub fn leave(&self, id: &str, channel: &str) -> bool {
        let mut inner = self.inner.write();
        let RegistryInner {
            connections,
            channels,
        } = &mut *inner;

        if let Some(entry) = connections.get_mut(id) {
            entry.channels.remove(channel);
        }
        channels
            .get_mut(channel)
            .map(|members| members.remove(id))
            .unwrap_or(false)
    }

    /// Snapshot of the current members of `channel`. An unknown channel
    /// yields an empty list and is not created.
    pub fn members(&self, channel: &str) -> Vec<Member> {
        let inner = self.inner.read();
        let Some(ids) = inner.channels.get(channel) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                inner.connections.get(id).map(|entry| Member {
                    id: id.clone(),
                    sink: Arc::clone(&entry.sink),
                })
            })
            .collect()
    }

    /// Sorted ids of the current members of `channel`.
    pub fn member_ids(&self, channel: &str) -> Vec<ConnectionId> {
        let inner = self.inner.read();
        let mut ids: Vec<ConnectionId> = inner
            .channels
            .get(channel)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.inner
            .read()
            .channels
            .get(channel)
            .map_or(0, HashSet::len)
    }

    pub fn is_member(&self, id: &str, channel: &str) -> bool {
        self.inner
            .read()
            .channels
            .get(channel)
            .is_some_and(|members| members.contains(id))
    }

    pub fn channel_exists(&self, channel: &str) -> bool {
        self.inner.read().channels.contains_key(channel)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().connections.contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Ids of every registered connection, sorted.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.inner.read().connections.keys().cloned().collect();
        ids.sort();
        ids
    }
}
