//! Metric names recorded by the protocol layer.

/// Messages routed to a handler (counter, labels: node).
pub const NODE_DISPATCH_TOTAL: &str = "node_dispatch_total";
/// Handler faults caught at the dispatch boundary or during a walk
/// (counter, labels: node, category).
pub const NODE_HANDLER_FAULTS_TOTAL: &str = "node_handler_faults_total";
/// Messages for nodes without a registry entry (counter).
pub const NODE_UNREGISTERED_TOTAL: &str = "node_unregistered_total";
/// Full-sync walks run (counter).
pub const FULL_SYNC_TOTAL: &str = "full_sync_total";
/// Full-sync walks abandoned because the transport rejected an update
/// (counter).
pub const FULL_SYNC_REJECTED_TOTAL: &str = "full_sync_rejected_total";
/// Updates delivered per full-sync walk (histogram).
pub const FULL_SYNC_UPDATES: &str = "full_sync_updates";
/// Full-sync walk duration (histogram).
pub const FULL_SYNC_DURATION_SECONDS: &str = "full_sync_duration_seconds";
