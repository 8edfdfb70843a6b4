//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use selfinotify_core::config::RealtimeConfig;
use selfinotify_core::result::AppResult;
use selfinotify_database::repositories::ApplicationRepository;
use selfinotify_entity::application::Application;

use crate::broadcaster::ChannelBroadcaster;
use crate::connection::authenticator::ChannelAuthenticator;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::registry::ConnectionRegistry;

/// Central real-time engine that coordinates the WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Channel broadcaster.
    pub broadcaster: Arc<ChannelBroadcaster>,
    /// Token authenticator.
    pub authenticator: Arc<ChannelAuthenticator>,
    /// Realtime configuration.
    pub config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig, applications: ApplicationRepository) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let registry = Arc::new(ConnectionRegistry::new(config.event_buffer_size));
        let broadcaster = Arc::new(ChannelBroadcaster::new(registry.clone()));
        let authenticator = Arc::new(ChannelAuthenticator::new(applications));

        info!("Real-time engine initialized");

        Self {
            registry,
            broadcaster,
            authenticator,
            config,
            shutdown_tx,
        }
    }

    /// Creates a handle for a freshly accepted connection.
    ///
    /// The session is not yet a member of any channel; it must authenticate
    /// first. The returned receiver is the connection's outbound stream.
    pub fn create_handle(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (handle, rx) = ConnectionHandle::new(self.config.channel_buffer_size);
        (Arc::new(handle), rx)
    }

    /// Authenticates a session and joins it to its application's channel.
    ///
    /// Fails with `InvalidToken` when the token resolves to no application;
    /// the session stays outside every channel in that case.
    pub async fn authenticate_session(
        &self,
        handle: Arc<ConnectionHandle>,
        app_token: &str,
    ) -> AppResult<Application> {
        let application = self.authenticator.verify(app_token).await?;
        self.registry.join(handle, &application.app_token);
        Ok(application)
    }

    /// Removes a session from its channel, if it joined one.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        self.registry.leave(conn_id);
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
    }
}
