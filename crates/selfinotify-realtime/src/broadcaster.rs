//! Channel-scoped fan-out of wire messages.

use std::sync::Arc;

use tracing::debug;

use selfinotify_core::error::AppError;
use selfinotify_core::result::AppResult;

use crate::message::types::OutboundMessage;
use crate::registry::ConnectionRegistry;

/// Broadcasts messages to every session joined to a channel.
///
/// The contract is attempted delivery to all sessions known-joined at call
/// time: a socket that silently drops its copy does not fail the broadcast.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl ChannelBroadcaster {
    /// Create a new broadcaster over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Broadcast a message to a channel.
    ///
    /// Returns the channel's member count at call time, i.e. the number of
    /// sessions the delivery was attempted to. Serialization failure is a
    /// transport error; per-socket drops are not.
    pub fn broadcast(&self, app_token: &str, message: &OutboundMessage) -> AppResult<usize> {
        let members = self.registry.members(app_token);

        let serialized = serde_json::to_string(message)
            .map_err(|e| AppError::transport(format!("Failed to serialize broadcast: {e}")))?;

        let mut queued = 0usize;
        for handle in &members {
            if handle.send(serialized.clone()) {
                queued += 1;
            }
        }

        debug!(
            app_token = %app_token,
            members = members.len(),
            queued,
            "Broadcast to channel"
        );

        Ok(members.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::handle::ConnectionHandle;
    use chrono::Utc;
    use uuid::Uuid;

    fn notification() -> OutboundMessage {
        OutboundMessage::Notification {
            id: 1,
            title: "Test".to_string(),
            message: "hello".to_string(),
            file_url: None,
            sent_at: Utc::now(),
            job_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = ChannelBroadcaster::new(registry.clone());

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (handle, rx) = ConnectionHandle::new(8);
            registry.join(Arc::new(handle), "app_one");
            receivers.push(rx);
        }

        let count = broadcaster.broadcast("app_one", &notification()).unwrap();
        assert_eq!(count, 3);

        for rx in &mut receivers {
            let raw = rx.recv().await.unwrap();
            let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(json["type"], "notification");
            assert_eq!(json["title"], "Test");
        }
    }

    #[tokio::test]
    async fn broadcast_to_empty_channel_reports_zero() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = ChannelBroadcaster::new(registry);

        let count = broadcaster.broadcast("app_ghost", &notification()).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn broadcast_does_not_leak_across_channels() {
        let registry = Arc::new(ConnectionRegistry::new(16));
        let broadcaster = ChannelBroadcaster::new(registry.clone());

        let (member, mut member_rx) = ConnectionHandle::new(8);
        let (bystander, mut bystander_rx) = ConnectionHandle::new(8);
        registry.join(Arc::new(member), "app_one");
        registry.join(Arc::new(bystander), "app_two");

        let count = broadcaster.broadcast("app_one", &notification()).unwrap();
        assert_eq!(count, 1);

        assert!(member_rx.recv().await.is_some());
        assert!(bystander_rx.try_recv().is_err());
    }
}
