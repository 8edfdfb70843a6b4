//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use selfinotify_entity::application::Application;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Join a channel by presenting its application token.
    Authenticate {
        /// Channel token.
        app_token: String,
    },
    /// Liveness probe; the server answers with a pong.
    Ping,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Authentication succeeded; the session joined the token's channel.
    Authenticated {
        /// Metadata of the joined application.
        application: ChannelInfo,
    },
    /// Authentication failed; the session remains outside any channel.
    AuthError {
        /// Failure reason.
        message: String,
    },
    /// Notification delivery.
    Notification {
        /// Notification record id.
        id: i64,
        /// Title.
        title: String,
        /// Body.
        message: String,
        /// Optional attachment URL.
        file_url: Option<String>,
        /// Dispatch timestamp.
        sent_at: DateTime<Utc>,
        /// Queue job that carried this delivery.
        job_id: Uuid,
    },
    /// Pong response to a client ping.
    Pong {
        /// Server timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Protocol-level error.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

/// Application metadata included in the authenticated acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Application id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

impl From<&Application> for ChannelInfo {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            name: app.name.clone(),
            description: app.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authenticate_message_parses() {
        let raw = r#"{"type": "authenticate", "app_token": "app_abc123"}"#;
        let msg: InboundMessage = serde_json::from_str(raw).unwrap();
        match msg {
            InboundMessage::Authenticate { app_token } => assert_eq!(app_token, "app_abc123"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn ping_message_parses() {
        let msg: InboundMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Ping));
    }

    #[test]
    fn notification_wire_format_field_names() {
        let msg = OutboundMessage::Notification {
            id: 12,
            title: "Test".to_string(),
            message: "hello".to_string(),
            file_url: None,
            sent_at: Utc::now(),
            job_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["id"], 12);
        assert_eq!(json["title"], "Test");
        assert_eq!(json["message"], "hello");
        assert!(json.get("file_url").is_some());
        assert!(json.get("sent_at").is_some());
        assert!(json.get("job_id").is_some());
    }

    #[test]
    fn auth_error_is_tagged() {
        let msg = OutboundMessage::AuthError {
            message: "Invalid app token".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "auth_error");
    }
}
