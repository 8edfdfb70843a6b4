//! WebSocket upgrade handler and session protocol loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use selfinotify_realtime::message::{InboundMessage, OutboundMessage};
use selfinotify_realtime::ConnectionHandle;

use crate::state::AppState;

/// GET /ws — WebSocket upgrade.
///
/// The session connects unauthenticated and must send an `authenticate`
/// message carrying its application token before it receives anything.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(state, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.realtime.create_handle();
    let conn_id = handle.id;
    let mut shutdown = state.realtime.shutdown_receiver();
    let mut closed = handle.closed_signal();

    info!(conn_id = %conn_id, "WebSocket connection established");

    // Forward queued outbound messages onto the socket, with keepalive pings.
    let ping_interval =
        std::time::Duration::from_secs(state.realtime.config.ping_interval_seconds);
    let outbound_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await;
        loop {
            tokio::select! {
                msg = outbound_rx.recv() => {
                    match msg {
                        Some(msg) => {
                            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = ws_rx.next() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&state, &handle, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            // disconnect_channel marks evicted handles closed; wait_for also
            // fires when the handle was closed before this loop started.
            // Drop the non-Send watch::Ref inside the arm so the select
            // output stays Send.
            _ = async { let _ = closed.wait_for(|closed| *closed).await; } => {
                info!(conn_id = %conn_id, "Session evicted from channel");
                break;
            }
            _ = shutdown.recv() => {
                info!(conn_id = %conn_id, "Closing session for engine shutdown");
                break;
            }
        }
    }

    outbound_task.abort();
    handle.mark_closed();
    state.realtime.disconnect(&conn_id);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Processes one inbound message from the client.
async fn handle_inbound(state: &AppState, handle: &Arc<ConnectionHandle>, text: &str) {
    let inbound = match serde_json::from_str::<InboundMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(conn_id = %handle.id, error = %e, "Unparseable inbound message");
            send(
                handle,
                &OutboundMessage::Error {
                    code: "BAD_MESSAGE".to_string(),
                    message: "Message could not be parsed".to_string(),
                },
            );
            return;
        }
    };

    match inbound {
        InboundMessage::Authenticate { app_token } => {
            match state
                .realtime
                .authenticate_session(handle.clone(), &app_token)
                .await
            {
                Ok(application) => {
                    info!(
                        conn_id = %handle.id,
                        application_id = application.id,
                        "Session authenticated"
                    );
                    send(
                        handle,
                        &OutboundMessage::Authenticated {
                            application: (&application).into(),
                        },
                    );
                }
                Err(e) => {
                    debug!(conn_id = %handle.id, "Authentication failed: {}", e);
                    send(
                        handle,
                        &OutboundMessage::AuthError { message: e.message },
                    );
                }
            }
        }
        InboundMessage::Ping => {
            send(
                handle,
                &OutboundMessage::Pong {
                    timestamp: Utc::now(),
                },
            );
        }
    }
}

fn send(handle: &Arc<ConnectionHandle>, message: &OutboundMessage) {
    match serde_json::to_string(message) {
        Ok(raw) => {
            handle.send(raw);
        }
        Err(e) => warn!(conn_id = %handle.id, error = %e, "Failed to serialize message"),
    }
}
