//! # selfinotify-realtime
//!
//! Fan-out transport and connection registry for SelfiNotify:
//!
//! - Per-token channel membership with prune-on-empty bookkeeping
//! - Connection handles backed by bounded mpsc senders
//! - Token authentication against the application table
//! - Channel-scoped broadcast of wire messages
//! - A registry event stream for the operator-facing stats surface

pub mod broadcaster;
pub mod connection;
pub mod message;
pub mod registry;
pub mod server;

pub use broadcaster::ChannelBroadcaster;
pub use connection::authenticator::ChannelAuthenticator;
pub use connection::handle::{ConnectionHandle, ConnectionId};
pub use registry::{ConnectionRegistry, RegistryEvent};
pub use server::RealtimeEngine;
