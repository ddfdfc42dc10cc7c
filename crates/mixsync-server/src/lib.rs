//! # mixsync-server
//!
//! Axum HTTP + `WebSocket` front end for the node protocol.
//!
//! - `/ws`: one client per socket; full sync on connect, then dispatch of
//!   every inbound frame
//! - [`ClientHub`]: bounded per-client queues, unicast updates and broadcast
//! - [`FeedbackBridge`]: session change feed fanned out to every client
//! - `/health` and Prometheus `/metrics`
//! - Graceful shutdown via [`ShutdownCoordinator`]

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, MixsyncServer};
pub use shutdown::ShutdownCoordinator;
pub use websocket::feedback::FeedbackBridge;
pub use websocket::hub::ClientHub;
