//! Inbound frame handling.

use metrics::counter;
use mixsync_core::{ClientId, NodeStateMessage};
use mixsync_protocol::{DispatchOutcome, Dispatcher};
use tracing::debug;

use crate::metrics::WS_MALFORMED_FRAMES_TOTAL;

/// What became of one inbound text frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Decoded and dispatched.
    Dispatched(DispatchOutcome),
    /// Named a node this server does not know.
    UnknownNode,
    /// Not a node message at all.
    Malformed,
}

/// Decode `text` and dispatch it on behalf of `client`.
///
/// Nothing is ever sent back for a bad frame: malformed input is logged at
/// `debug` and unknown node names are dropped silently.
pub fn handle_text(text: &str, client: &ClientId, dispatcher: &Dispatcher) -> FrameOutcome {
    match NodeStateMessage::decode(text) {
        Ok(Some(msg)) => FrameOutcome::Dispatched(dispatcher.dispatch(client, &msg)),
        Ok(None) => FrameOutcome::UnknownNode,
        Err(err) => {
            counter!(WS_MALFORMED_FRAMES_TOTAL).increment(1);
            debug!(client_id = %client, len = text.len(), error = %err, "malformed frame dropped");
            FrameOutcome::Malformed
        }
    }
}
