//! One client's WebSocket lifecycle, from upgrade through disconnect.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use mixsync_core::ClientId;
use mixsync_protocol::Dispatcher;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_text;
use super::hub::ClientHub;
use crate::config::ServerConfig;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::shutdown::ShutdownCoordinator;

/// Everything a session needs from the server.
#[derive(Clone)]
pub struct SessionDeps {
    /// Shared dispatcher; its transport is `hub`.
    pub dispatcher: Dispatcher,
    /// Connected clients.
    pub hub: Arc<ClientHub>,
    /// Queue sizes and heartbeat timing.
    pub config: Arc<ServerConfig>,
    /// Server-wide shutdown; the client's sync token is a child of it.
    pub shutdown: Arc<ShutdownCoordinator>,
}

/// Serve one connected client.
///
/// 1. Registers the client in the hub
/// 2. Starts a full sync on the blocking pool
/// 3. Forwards queued frames to the socket, pinging on the heartbeat interval
/// 4. Decodes and dispatches every inbound text (or UTF-8 binary) frame
/// 5. On disconnect or shutdown, cancels the sync and unregisters
#[instrument(skip_all, fields(client_id = %client_id))]
pub async fn run_ws_session(ws: WebSocket, client_id: ClientId, deps: SessionDeps) {
    let SessionDeps {
        dispatcher,
        hub,
        config,
        shutdown,
    } = deps;
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.send_queue.max(1));
    let sync_token = shutdown.child_token();
    let connection = Arc::new(ClientConnection::new(
        client_id.clone(),
        send_tx,
        sync_token.clone(),
    ));

    let connected_at = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    hub.add(Arc::clone(&connection));

    let sync_client = client_id.clone();
    let sync_dispatcher = dispatcher.clone();
    let sync = tokio::task::spawn_blocking(move || {
        sync_dispatcher.update_all_nodes(&sync_client, &sync_token)
    });

    let outbound_conn = Arc::clone(&connection);
    let outbound_shutdown = shutdown.token();
    let ping_every = config.heartbeat_interval();
    let pong_timeout = config.heartbeat_timeout();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(ping_every);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                frame = send_rx.recv() => {
                    let Some(frame) = frame else { break };
                    if ws_tx.send(Message::Text(frame.as_ref().clone().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive() && outbound_conn.last_pong_elapsed() > pong_timeout {
                        warn!(timeout = ?pong_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });
    let outbound_abort = outbound.abort_handle();

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut outbound => {
                debug!("outbound writer finished");
                break;
            }
        };
        let Some(Ok(msg)) = frame else { break };
        connection.mark_alive();

        let text = match msg {
            Message::Text(ref text) => text.as_str(),
            Message::Binary(ref data) => {
                if let Ok(text) = std::str::from_utf8(data) {
                    text
                } else {
                    debug!(len = data.len(), "dropping non-UTF-8 binary frame");
                    continue;
                }
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        let _ = handle_text(text, &client_id, &dispatcher);
    }

    let _ = hub.remove(&client_id);
    outbound_abort.abort();
    match sync.await {
        Ok(report) => debug!(
            emitted = report.emitted,
            cancelled = report.cancelled,
            rejected = report.rejected,
            "full sync settled"
        ),
        Err(err) => warn!(error = %err, "full sync task failed"),
    }

    info!(dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connected_at.elapsed().as_secs_f64());
}
