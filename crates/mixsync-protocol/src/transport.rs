//! The transport boundary and the update emission primitive.

use mixsync_core::{Address, ClientId, NodeId, NodeStateMessage, TypedValue};
use tracing::trace;

/// Delivers node updates to individual clients.
///
/// Implementations must not block: a slow client gets its update dropped
/// (and counted) rather than stalling the caller.
pub trait UpdateSink: Send + Sync {
    /// Queue `message` for `client`. Returns whether it was accepted.
    ///
    /// `flush` asks the transport to send without waiting for more updates.
    fn update_client(&self, client: &ClientId, message: NodeStateMessage, flush: bool) -> bool;
}

/// Package an update for `client` and hand it to the transport, flushed.
///
/// No retry and no buffering: a rejected update is lost.
pub fn update(
    sink: &dyn UpdateSink,
    client: &ClientId,
    node: NodeId,
    address: Address,
    values: Vec<TypedValue>,
) -> bool {
    trace!(client_id = %client, %node, %address, "update");
    sink.update_client(client, NodeStateMessage::update(node, address, values), true)
}
