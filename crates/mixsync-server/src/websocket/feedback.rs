//! Feedback bridge: forwards session change notifications to every client.

use std::sync::Arc;

use metrics::counter;
use mixsync_core::NodeStateMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::hub::ClientHub;
use crate::metrics::FEEDBACK_LAGGED_TOTAL;

/// Fans session changes out through the [`ClientHub`].
///
/// The writer receives its own change too; that is how a control surface
/// learns the value the session actually stored after clamping.
pub struct FeedbackBridge {
    rx: broadcast::Receiver<NodeStateMessage>,
    hub: Arc<ClientHub>,
}

impl FeedbackBridge {
    /// Bridge an existing change-feed subscription.
    pub fn new(rx: broadcast::Receiver<NodeStateMessage>, hub: Arc<ClientHub>) -> Self {
        Self { rx, hub }
    }

    /// Forward changes until the feed closes or `shutdown` fires.
    #[instrument(skip_all, name = "feedback_bridge")]
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("feedback bridge stopping on shutdown");
                    break;
                }
                received = self.rx.recv() => received,
            };
            match received {
                Ok(change) => {
                    let _ = self.hub.broadcast_all(&change);
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    counter!(FEEDBACK_LAGGED_TOTAL).increment(missed);
                    warn!(missed, "feedback bridge lagged, changes lost");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("change feed closed, feedback bridge exiting");
                    break;
                }
            }
        }
    }
}
