//! Node registry: the dispatch table from [`NodeId`] to handler.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use mixsync_core::{Address, ClientId, NodeId, NodeStateMessage, TypedValue};
use mixsync_session::SessionFacade;
use tracing::debug;

use crate::errors::HandlerError;
use crate::handlers;
use crate::transport::{self, UpdateSink};

/// Collaborators a handler runs against.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    /// Session being mirrored.
    pub session: &'a dyn SessionFacade,
    /// Transport for outbound updates.
    pub sink: &'a dyn UpdateSink,
}

impl NodeContext<'_> {
    /// Emit an update to `client`.
    pub fn update(
        &self,
        client: &ClientId,
        node: NodeId,
        address: Address,
        values: Vec<TypedValue>,
    ) -> bool {
        transport::update(self.sink, client, node, address, values)
    }
}

/// Read and write behavior of one node.
///
/// The dispatcher has already checked the address length against the
/// node's level before either method runs. `write` is not given the client:
/// confirmation of a write reaches clients through the session's change
/// feed, never through the handler.
pub trait NodeHandler: Send + Sync {
    /// Query the session and emit the current value to `client`.
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError>;

    /// Apply the written value to the session.
    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError>;
}

static GLOBAL: LazyLock<Arc<NodeRegistry>> = LazyLock::new(|| Arc::new(NodeRegistry::builtin()));

/// Mapping from node to handler. At most one handler per node.
pub struct NodeRegistry {
    handlers: HashMap<NodeId, Arc<dyn NodeHandler>>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the built-in handlers for every value node.
    /// Descriptor nodes are read-only metadata and get no entry.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        handlers::register_all(&mut registry);
        registry
    }

    /// Process-wide built-in registry, built on first use.
    pub fn global() -> &'static Arc<Self> {
        &GLOBAL
    }

    /// Register a handler, replacing any previous one for `node`.
    pub fn register(&mut self, node: NodeId, handler: impl NodeHandler + 'static) {
        if self.handlers.insert(node, Arc::new(handler)).is_some() {
            debug!(%node, "replaced node handler");
        }
    }

    /// Handler for `node`, if any.
    pub fn lookup(&self, node: NodeId) -> Option<&Arc<dyn NodeHandler>> {
        self.handlers.get(&node)
    }

    /// Registered nodes, in tree order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.handlers.keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    /// Whether `node` has a handler.
    pub fn has_node(&self, node: NodeId) -> bool {
        self.handlers.contains_key(&node)
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
