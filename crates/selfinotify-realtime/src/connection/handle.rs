//! Individual WebSocket connection handle.

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single WebSocket connection.
///
/// Holds the sender side of the connection's outbound buffer. Membership
/// metadata (which channel the session joined) lives in the registry, not
/// here — the handle stays valid whether or not the session authenticated.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Sender for serialized outbound messages.
    sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Close flag; subscribers are woken when it flips to true.
    closed: watch::Sender<bool>,
}

impl ConnectionHandle {
    /// Create a new connection handle with the given outbound buffer size.
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        let (closed, _) = watch::channel(false);
        let handle = Self {
            id: Uuid::new_v4(),
            sender: tx,
            connected_at: Utc::now(),
            closed,
        };
        (handle, rx)
    }

    /// Queue a serialized message for this connection.
    ///
    /// Returns `false` when the message was dropped: the buffer was full or
    /// the receiving side is gone. A full buffer does not kill the
    /// connection; a closed receiver does.
    pub fn send(&self, msg: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        !*self.closed.borrow()
    }

    /// Mark the connection as closed.
    pub fn mark_closed(&self) {
        self.closed.send_replace(true);
    }

    /// Receiver that resolves once the handle is closed.
    ///
    /// The session loop waits on this so an eviction (channel disconnect,
    /// engine shutdown) tears the socket down even when the client never
    /// sends another frame.
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (handle, mut rx) = ConnectionHandle::new(4);
        assert!(handle.send("hello".to_string()));
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_marks_closed() {
        let (handle, rx) = ConnectionHandle::new(4);
        drop(rx);
        assert!(!handle.send("hello".to_string()));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn closed_handle_refuses_sends() {
        let (handle, _rx) = ConnectionHandle::new(4);
        handle.mark_closed();
        assert!(!handle.send("hello".to_string()));
    }

    #[tokio::test]
    async fn mark_closed_wakes_closed_signal() {
        let (handle, _rx) = ConnectionHandle::new(4);
        let mut closed = handle.closed_signal();

        let waiter = tokio::spawn(async move {
            closed.wait_for(|closed| *closed).await.unwrap();
        });

        handle.mark_closed();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("signal fired")
            .unwrap();
    }
}
