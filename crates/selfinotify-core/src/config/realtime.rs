//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Registry event stream buffer size.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            event_buffer_size: default_event_buffer(),
            ping_interval_seconds: default_ping_interval(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_event_buffer() -> usize {
    128
}

fn default_ping_interval() -> u64 {
    30
}
