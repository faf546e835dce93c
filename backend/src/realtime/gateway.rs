//! Publish gateway handed to request handlers so they can push events to
//! realtime subscribers after a write succeeds.

use std::sync::Arc;

use common::{ServerEvent, DASHBOARD_CHANNEL};
use serde::Serialize;

use super::registry::ConnectionRegistry;

/// Cheap to clone; every clone publishes through the same registry.
#[derive(Clone)]
pub struct PublishGateway {
    registry: Arc<ConnectionRegistry>,
}

impl PublishGateway {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Sends `event_name` with `payload` to every current member of
    /// `channel` and returns how many members were attempted.
    ///
    /// Membership is snapshotted first; joins and leaves that happen while
    /// delivering do not affect this call. A failed delivery to one member is
    /// logged and skipped. Publishing to an unknown channel returns 0 and
    /// does not create it.
    pub fn publish(&self, channel: &str, event_name: &str, payload: serde_json::Value) -> usize {
        let members = self.registry.members(channel);
        if members.is_empty() {
            tracing::debug!(channel, event = event_name, "no subscribers, nothing published");
            return 0;
        }

        let event = Arc::new(ServerEvent::new(event_name, payload));
        let mut failed = 0usize;
        for member in &members {
            if let Err(e) = member.deliver(Arc::clone(&event)) {
                failed += 1;
                tracing::warn!(
                    connection = %member.id,
                    channel,
                    event = event_name,
                    "delivery failed: {e}"
                );
            }
        }

        tracing::info!(
            channel,
            event = event_name,
            attempted = members.len(),
            failed,
            "published event"
        );
        members.len()
    }

    pub fn publish_dashboard(&self, event_name: &str, payload: serde_json::Value) -> usize {
        self.publish(DASHBOARD_CHANNEL, event_name, payload)
    }

    /// Serializes `payload` and publishes it.
    pub fn publish_json<T: Serialize>(
        &self,
        channel: &str,
        event_name: &str,
        payload: &T,
    ) -> Result<usize, serde_json::Error> {
        let value = serde_json::to_value(payload)?;
        Ok(self.publish(channel, event_name, value))
    }
}
