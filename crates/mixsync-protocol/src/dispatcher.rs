//! Message routing with fault isolation.

use std::sync::Arc;

use metrics::counter;
use mixsync_core::{ClientId, NodeStateMessage};
use mixsync_session::SessionFacade;
use tracing::{debug, instrument, warn};

use crate::errors::HandlerError;
use crate::metrics::{NODE_DISPATCH_TOTAL, NODE_HANDLER_FAULTS_TOTAL, NODE_UNREGISTERED_TOTAL};
use crate::registry::{NodeContext, NodeRegistry};
use crate::transport::UpdateSink;

/// What happened to a dispatched message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran to completion.
    Handled,
    /// No handler for the node; the message was dropped.
    Unregistered,
    /// The handler failed; the fault was logged and counted.
    Faulted {
        /// [`HandlerError::category`] of the fault.
        category: &'static str,
    },
}

/// Routes incoming node messages to their handlers.
///
/// Cheap to clone; clones share the registry, session and transport.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<NodeRegistry>,
    session: Arc<dyn SessionFacade>,
    sink: Arc<dyn UpdateSink>,
}

impl Dispatcher {
    /// Dispatcher over the process-wide built-in registry.
    pub fn new(session: Arc<dyn SessionFacade>, sink: Arc<dyn UpdateSink>) -> Self {
        Self::with_registry(Arc::clone(NodeRegistry::global()), session, sink)
    }

    /// Dispatcher over a specific registry.
    pub fn with_registry(
        registry: Arc<NodeRegistry>,
        session: Arc<dyn SessionFacade>,
        sink: Arc<dyn UpdateSink>,
    ) -> Self {
        Self {
            registry,
            session,
            sink,
        }
    }

    /// Registry in use.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Session being mirrored.
    pub fn session(&self) -> &Arc<dyn SessionFacade> {
        &self.session
    }

    pub(crate) fn context(&self) -> NodeContext<'_> {
        NodeContext {
            session: self.session.as_ref(),
            sink: self.sink.as_ref(),
        }
    }

    /// Route `msg` from `client` to its handler.
    ///
    /// Never fails: unknown nodes are dropped and handler faults are logged
    /// at `warn`, counted, and reported only through the returned outcome.
    #[instrument(level = "debug", skip_all, fields(client_id = %client, node = %msg.node))]
    pub fn dispatch(&self, client: &ClientId, msg: &NodeStateMessage) -> DispatchOutcome {
        let Some(handler) = self.registry.lookup(msg.node) else {
            counter!(NODE_UNREGISTERED_TOTAL).increment(1);
            debug!(address = %msg.address, "no handler for node, dropping");
            return DispatchOutcome::Unregistered;
        };
        counter!(NODE_DISPATCH_TOTAL, "node" => msg.node.as_str()).increment(1);

        let ctx = self.context();
        let result = msg
            .address
            .check_level(msg.node.level())
            .map_err(HandlerError::from)
            .and_then(|()| {
                if msg.is_write() {
                    handler.write(&ctx, msg)
                } else {
                    handler.read(&ctx, client, msg)
                }
            });

        match result {
            Ok(()) => DispatchOutcome::Handled,
            Err(err) => {
                let category = err.category();
                counter!(
                    NODE_HANDLER_FAULTS_TOTAL,
                    "node" => msg.node.as_str(),
                    "category" => category
                )
                .increment(1);
                warn!(
                    client_id = %client,
                    node = %msg.node,
                    address = %msg.address,
                    category,
                    error = %err,
                    "node handler fault"
                );
                DispatchOutcome::Faulted { category }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixsync_core::logging::capture_logs;
    use mixsync_core::{Address, NodeId, TypedValue};
    use mixsync_session::fixtures::{four_strip_session, two_strip_session};
    use parking_lot::Mutex;
    use tracing::Level;

    use crate::registry::NodeHandler;

    #[derive(Default)]
    struct Sink(Mutex<Vec<(ClientId, NodeStateMessage)>>);

    impl UpdateSink for Sink {
        fn update_client(&self, client: &ClientId, message: NodeStateMessage, _flush: bool) -> bool {
            self.0.lock().push((client.clone(), message));
            true
        }
    }

    fn dispatcher(session: Arc<dyn SessionFacade>) -> (Dispatcher, Arc<Sink>) {
        let sink = Arc::new(Sink::default());
        let d = Dispatcher::new(session, Arc::clone(&sink) as Arc<dyn UpdateSink>);
        (d, sink)
    }

    #[test]
    fn read_emits_to_requesting_client_only() {
        let (d, sink) = dispatcher(Arc::new(two_strip_session()));
        let client = ClientId::from_raw("reader");
        let outcome = d.dispatch(&client, &NodeStateMessage::read(NodeId::Tempo, Address::global()));
        assert_eq!(outcome, DispatchOutcome::Handled);

        let sent = sink.0.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, client);
        assert_eq!(sent[0].1.values, vec![TypedValue::Double(120.0)]);
    }

    #[test]
    fn descriptor_nodes_are_unregistered() {
        let (d, sink) = dispatcher(Arc::new(two_strip_session()));
        let outcome = d.dispatch(
            &ClientId::new(),
            &NodeStateMessage::read(NodeId::StripDesc, Address::strip(0)),
        );
        assert_eq!(outcome, DispatchOutcome::Unregistered);
        assert!(sink.0.lock().is_empty());
    }

    #[test]
    fn wrong_address_length_is_a_fault() {
        let (logs, _guard) = capture_logs();
        let (d, sink) = dispatcher(Arc::new(two_strip_session()));
        let outcome = d.dispatch(
            &ClientId::from_raw("c"),
            &NodeStateMessage::write(NodeId::StripGain, Address::plugin(0, 0), -6.0),
        );
        assert_eq!(outcome, DispatchOutcome::Faulted { category: "address" });
        assert!(sink.0.lock().is_empty());
        assert!(logs.has_event(Level::WARN, "node handler fault"));
    }

    #[test]
    fn out_of_range_strip_is_logged_with_context() {
        let (logs, _guard) = capture_logs();
        let (d, _sink) = dispatcher(Arc::new(four_strip_session()));
        let outcome = d.dispatch(
            &ClientId::from_raw("surface"),
            &NodeStateMessage::write(NodeId::StripGain, Address::strip(999), -6.0),
        );
        assert_eq!(outcome, DispatchOutcome::Faulted { category: "not_found" });

        let faults = logs.with_field(Level::WARN, "client_id", "surface");
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].field("node"), Some("strip_gain"));
        assert_eq!(faults[0].field("address"), Some("[999]"));
    }

    #[test]
    fn bad_value_is_a_fault() {
        let (d, _sink) = dispatcher(Arc::new(two_strip_session()));
        let outcome = d.dispatch(
            &ClientId::new(),
            &NodeStateMessage::write(NodeId::StripMute, Address::strip(0), "sometimes"),
        );
        assert_eq!(outcome, DispatchOutcome::Faulted { category: "value" });
    }

    #[derive(Clone, Default)]
    struct CountingHandler(Arc<Mutex<(u32, u32)>>);

    impl NodeHandler for CountingHandler {
        fn read(
            &self,
            _ctx: &NodeContext<'_>,
            _client: &ClientId,
            _msg: &NodeStateMessage,
        ) -> Result<(), HandlerError> {
            self.0.lock().0 += 1;
            Ok(())
        }

        fn write(&self, _ctx: &NodeContext<'_>, _msg: &NodeStateMessage) -> Result<(), HandlerError> {
            self.0.lock().1 += 1;
            Ok(())
        }
    }

    #[test]
    fn direction_selects_read_or_write() {
        let counts = CountingHandler::default();
        let mut registry = NodeRegistry::new();
        registry.register(NodeId::Tempo, counts.clone());
        let d = Dispatcher::with_registry(
            Arc::new(registry),
            Arc::new(two_strip_session()),
            Arc::new(Sink::default()),
        );
        let client = ClientId::new();
        let _ = d.dispatch(&client, &NodeStateMessage::read(NodeId::Tempo, Address::global()));
        let _ = d.dispatch(
            &client,
            &NodeStateMessage::write(NodeId::Tempo, Address::global(), 99.0),
        );
        let _ = d.dispatch(
            &client,
            &NodeStateMessage::write(NodeId::Tempo, Address::global(), 98.0),
        );
        assert_eq!(*counts.0.lock(), (1, 2));
        assert_eq!(d.registry().len(), 1);
        assert_eq!(
            d.dispatch(&client, &NodeStateMessage::read(NodeId::StripGain, Address::strip(0))),
            DispatchOutcome::Unregistered
        );
    }
}
