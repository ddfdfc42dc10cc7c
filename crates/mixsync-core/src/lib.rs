//! # mixsync-core
//!
//! Foundation types for the node-addressed session synchronization protocol.
//!
//! - [`TypedValue`]: the scalar vocabulary exchanged over the wire
//! - [`ParameterDescriptor`] / [`ValueShape`]: plugin parameter metadata
//! - [`NodeId`] / [`NodeLevel`]: every addressable leaf of the session tree
//! - [`Address`]: positional index path of a node instance
//! - [`NodeStateMessage`]: one read request, write, or update
//! - [`ClientId`]: identity of a connected client
//! - [`logging`]: `tracing` subscriber setup and test capture helpers

#![deny(unsafe_code)]

pub mod address;
pub mod client;
pub mod descriptor;
pub mod errors;
pub mod logging;
pub mod message;
pub mod node;
pub mod value;

pub use address::Address;
pub use client::ClientId;
pub use descriptor::{ParameterDescriptor, ValueShape};
pub use errors::{AddressError, DecodeError, ValueError};
pub use message::{Direction, NodeStateMessage};
pub use node::{NodeId, NodeLevel};
pub use value::{TypedValue, ValueKind};
