//! WebSocket client handling: connections, the client hub, inbound frame
//! dispatch and change feedback.

pub mod connection;
pub mod feedback;
pub mod handler;
pub mod hub;
pub mod session;
