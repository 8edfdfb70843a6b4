//! Connection registry — authoritative record of channel membership.
//!
//! Maps each application token to the live set of connection handles joined
//! to its channel. Only the registry mutates the maps; all access goes
//! through its methods. Membership is in-memory only and does not survive a
//! restart.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::connection::handle::{ConnectionHandle, ConnectionId};

/// Membership change event, published for the operator stats stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A session joined a channel.
    SessionJoined {
        /// Channel token.
        app_token: String,
        /// Connection that joined.
        connection_id: ConnectionId,
        /// Member count after the join.
        member_count: usize,
    },
    /// A session left a channel.
    SessionLeft {
        /// Channel token.
        app_token: String,
        /// Connection that left.
        connection_id: ConnectionId,
        /// Member count after the leave.
        member_count: usize,
    },
}

/// Point-in-time snapshot of channel membership.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStats {
    /// Total sessions across all channels.
    pub total_members: usize,
    /// Active channel count.
    pub channel_count: usize,
    /// Member count per channel token.
    pub channels: HashMap<String, usize>,
}

/// Registry of all channels and their joined sessions.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Channel token → joined handles.
    channels: DashMap<String, Vec<Arc<ConnectionHandle>>>,
    /// Reverse index: connection → channel token.
    memberships: DashMap<ConnectionId, String>,
    /// Membership change events.
    events: broadcast::Sender<RegistryEvent>,
}

impl ConnectionRegistry {
    /// Create a new registry with the given event stream buffer.
    pub fn new(event_buffer_size: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer_size);
        Self {
            channels: DashMap::new(),
            memberships: DashMap::new(),
            events,
        }
    }

    /// Admit an authenticated session to a channel.
    ///
    /// A connection belongs to at most one channel; re-joining moves it.
    pub fn join(&self, handle: Arc<ConnectionHandle>, app_token: &str) {
        if self.memberships.contains_key(&handle.id) {
            self.leave(&handle.id);
        }

        let conn_id = handle.id;
        let member_count = {
            let mut members = self.channels.entry(app_token.to_string()).or_default();
            members.push(handle);
            members.len()
        };
        self.memberships.insert(conn_id, app_token.to_string());

        debug!(conn_id = %conn_id, app_token = %app_token, member_count, "Session joined channel");

        let _ = self.events.send(RegistryEvent::SessionJoined {
            app_token: app_token.to_string(),
            connection_id: conn_id,
            member_count,
        });
    }

    /// Remove a session from whatever channel it joined.
    ///
    /// When the last member leaves, the channel entry itself is pruned so
    /// connect/disconnect churn cannot grow the map without bound.
    pub fn leave(&self, conn_id: &ConnectionId) {
        let Some((_, app_token)) = self.memberships.remove(conn_id) else {
            return;
        };

        let member_count = {
            let Some(mut members) = self.channels.get_mut(&app_token) else {
                return;
            };
            members.retain(|h| h.id != *conn_id);
            let remaining = members.len();
            if remaining == 0 {
                drop(members);
                self.channels.remove(&app_token);
            }
            remaining
        };

        debug!(conn_id = %conn_id, app_token = %app_token, member_count, "Session left channel");

        let _ = self.events.send(RegistryEvent::SessionLeft {
            app_token,
            connection_id: *conn_id,
            member_count,
        });
    }

    /// Current member handles of a channel (empty when unknown).
    pub fn members(&self, app_token: &str) -> Vec<Arc<ConnectionHandle>> {
        self.channels
            .get(app_token)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    /// Current member count of a channel.
    ///
    /// Zero is a valid, load-bearing answer: it drives the dispatch
    /// worker's retry verdict.
    pub fn member_count(&self, app_token: &str) -> usize {
        self.channels
            .get(app_token)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    /// Total sessions across all channels.
    pub fn total_members(&self) -> usize {
        self.channels.iter().map(|entry| entry.value().len()).sum()
    }

    /// Close every session joined to a channel and drop the channel.
    ///
    /// Used when an application's token is regenerated: sessions holding
    /// the old token must re-authenticate.
    pub fn disconnect_channel(&self, app_token: &str) -> usize {
        let Some((_, members)) = self.channels.remove(app_token) else {
            return 0;
        };

        for handle in &members {
            handle.mark_closed();
            self.memberships.remove(&handle.id);
            let _ = self.events.send(RegistryEvent::SessionLeft {
                app_token: app_token.to_string(),
                connection_id: handle.id,
                member_count: 0,
            });
        }

        info!(app_token = %app_token, count = members.len(), "Channel disconnected");
        members.len()
    }

    /// Snapshot of membership for the operator stats surface.
    pub fn stats(&self) -> ConnectionStats {
        let channels: HashMap<String, usize> = self
            .channels
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect();

        ConnectionStats {
            total_members: channels.values().sum(),
            channel_count: channels.len(),
            channels,
        }
    }

    /// Subscribe to membership change events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_handle() -> (Arc<ConnectionHandle>, tokio::sync::mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::new(8);
        (Arc::new(handle), rx)
    }

    #[tokio::test]
    async fn join_and_count_members() {
        let registry = ConnectionRegistry::new(16);
        let (h1, _rx1) = connected_handle();
        let (h2, _rx2) = connected_handle();

        registry.join(h1, "app_one");
        registry.join(h2, "app_one");

        assert_eq!(registry.member_count("app_one"), 2);
        assert_eq!(registry.member_count("app_other"), 0);
        assert_eq!(registry.total_members(), 2);
    }

    #[tokio::test]
    async fn leave_prunes_empty_channel() {
        let registry = ConnectionRegistry::new(16);
        let (h1, _rx1) = connected_handle();
        let conn_id = h1.id;

        registry.join(h1, "app_one");
        assert_eq!(registry.member_count("app_one"), 1);

        registry.leave(&conn_id);
        assert_eq!(registry.member_count("app_one"), 0);
        // The entry itself must be gone, not just emptied.
        assert_eq!(registry.stats().channel_count, 0);
    }

    #[tokio::test]
    async fn leave_unknown_connection_is_noop() {
        let registry = ConnectionRegistry::new(16);
        registry.leave(&uuid::Uuid::new_v4());
        assert_eq!(registry.total_members(), 0);
    }

    #[tokio::test]
    async fn rejoin_moves_connection_between_channels() {
        let registry = ConnectionRegistry::new(16);
        let (h1, _rx1) = connected_handle();

        registry.join(h1.clone(), "app_one");
        registry.join(h1, "app_two");

        assert_eq!(registry.member_count("app_one"), 0);
        assert_eq!(registry.member_count("app_two"), 1);
        assert_eq!(registry.total_members(), 1);
    }

    #[tokio::test]
    async fn disconnect_channel_closes_all_members() {
        let registry = ConnectionRegistry::new(16);
        let (h1, _rx1) = connected_handle();
        let (h2, _rx2) = connected_handle();
        let h1_clone = h1.clone();

        registry.join(h1, "app_one");
        registry.join(h2, "app_one");

        let closed = registry.disconnect_channel("app_one");
        assert_eq!(closed, 2);
        assert_eq!(registry.member_count("app_one"), 0);
        assert!(!h1_clone.is_alive());
    }

    #[tokio::test]
    async fn membership_changes_emit_events() {
        let registry = ConnectionRegistry::new(16);
        let mut events = registry.subscribe_events();
        let (h1, _rx1) = connected_handle();
        let conn_id = h1.id;

        registry.join(h1, "app_one");
        registry.leave(&conn_id);

        match events.recv().await.unwrap() {
            RegistryEvent::SessionJoined {
                app_token,
                member_count,
                ..
            } => {
                assert_eq!(app_token, "app_one");
                assert_eq!(member_count, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            RegistryEvent::SessionLeft { member_count, .. } => assert_eq!(member_count, 0),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_snapshot_reflects_channels() {
        let registry = ConnectionRegistry::new(16);
        let (h1, _rx1) = connected_handle();
        let (h2, _rx2) = connected_handle();
        let (h3, _rx3) = connected_handle();

        registry.join(h1, "app_one");
        registry.join(h2, "app_one");
        registry.join(h3, "app_two");

        let stats = registry.stats();
        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.channel_count, 2);
        assert_eq!(stats.channels["app_one"], 2);
        assert_eq!(stats.channels["app_two"], 1);
    }
}
