//! # mixsync-protocol
//!
//! Routing and enumeration for the node-addressed sync protocol.
//!
//! - [`NodeRegistry`]: immutable `NodeId` → [`NodeHandler`] table, built once
//! - [`Dispatcher`]: routes a message to its handler and isolates faults
//! - [`Dispatcher::update_all_nodes`]: full-state walk for a new client
//! - [`transport::update`]: the single emission primitive, over an [`UpdateSink`]

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod registry;
pub mod sync;
pub mod transport;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use errors::HandlerError;
pub use registry::{NodeContext, NodeHandler, NodeRegistry};
pub use sync::{PluginInserts, SyncReport, plugin_inserts};
pub use transport::UpdateSink;
