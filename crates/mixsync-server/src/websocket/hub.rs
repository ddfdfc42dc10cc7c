//! Registry of connected clients and the outbound side of the protocol.

use std::collections::HashMap;
use std::sync::Arc;

use mixsync_core::{ClientId, NodeStateMessage};
use mixsync_protocol::UpdateSink;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Connected clients indexed by [`ClientId`].
///
/// Implements [`UpdateSink`] so the dispatcher and the full-sync walk can
/// address a single client; [`broadcast_all`](Self::broadcast_all) serves
/// change feedback.
#[derive(Default)]
pub struct ClientHub {
    connections: RwLock<HashMap<ClientId, Arc<ClientConnection>>>,
}

impl ClientHub {
    /// Empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any previous one with the same id.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Unregister a connection, cancelling its full sync.
    pub fn remove(&self, id: &ClientId) -> Option<Arc<ClientConnection>> {
        let removed = self.connections.write().remove(id);
        if let Some(conn) = &removed {
            conn.cancel_sync();
        }
        removed
    }

    /// Look up a connection.
    pub fn get(&self, id: &ClientId) -> Option<Arc<ClientConnection>> {
        self.connections.read().get(id).cloned()
    }

    /// Snapshot of every connected client.
    pub fn connections(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Number of connected clients.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Cancel every in-flight full sync.
    pub fn cancel_all_syncs(&self) {
        for conn in self.connections.read().values() {
            conn.cancel_sync();
        }
    }

    /// Send `message` to every client. Returns how many queues accepted it.
    pub fn broadcast_all(&self, message: &NodeStateMessage) -> usize {
        let frame = match message.encode() {
            Ok(json) => Arc::new(json),
            Err(err) => {
                warn!(node = %message.node, error = %err, "failed to encode update");
                return 0;
            }
        };
        let conns = self.connections.read();
        let mut delivered = 0;
        for conn in conns.values() {
            if conn.send(Arc::clone(&frame)) {
                delivered += 1;
            } else {
                debug!(client_id = %conn.id, node = %message.node, "dropped feedback frame");
            }
        }
        debug!(
            node = %message.node,
            address = %message.address,
            recipients = conns.len(),
            delivered,
            "broadcast update"
        );
        delivered
    }
}

impl UpdateSink for ClientHub {
    /// Frames are handed to the socket writer as soon as they are queued, so
    /// `flush` needs no extra work here.
    fn update_client(&self, client: &ClientId, message: NodeStateMessage, _flush: bool) -> bool {
        let Some(conn) = self.get(client) else {
            debug!(client_id = %client, node = %message.node, "update for unknown client");
            return false;
        };
        match message.encode() {
            Ok(json) => {
                let sent = conn.send(Arc::new(json));
                if !sent {
                    debug!(client_id = %client, node = %message.node, "client queue full, update dropped");
                }
                sent
            }
            Err(err) => {
                warn!(client_id = %client, node = %message.node, error = %err, "failed to encode update");
                false
            }
        }
    }
}
