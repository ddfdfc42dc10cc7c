//! # mixsync-session
//!
//! The session side of the protocol boundary.
//!
//! - [`SessionFacade`]: synchronous, non-blocking access to tempo, strips,
//!   plugin inserts and parameters, with an explicit [`FacadeConcurrency`]
//! - [`ChangeFeed`]: broadcast of every successful mutation
//! - [`MemorySession`]: in-memory implementation of both
//! - [`fixtures`]: canned sessions for tests and the demo daemon

#![deny(unsafe_code)]

pub mod errors;
pub mod facade;
pub mod fixtures;
pub mod memory;

pub use errors::FacadeError;
pub use facade::{
    ChangeFeed, FacadeConcurrency, ParamControl, PluginInfo, SessionFacade, StripInfo, StripKind,
};
pub use memory::{MemoryPlugin, MemorySession, MemoryStrip};
