//! Node state messages and their JSON wire form.
//!
//! A frame on the wire looks like
//! `{"node":"strip_gain","address":[0],"values":[-6.0]}`. An empty `values`
//! array makes the frame a read request; anything else is a write. The short
//! field names `addr` and `val` are accepted on input.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::errors::DecodeError;
use crate::node::NodeId;
use crate::value::TypedValue;

/// Whether a message queries or mutates a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Request for the current value.
    Read,
    /// New value(s) for the node.
    Write,
}

/// One addressed read request, write, or outbound update.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeStateMessage {
    /// Addressed node.
    pub node: NodeId,
    /// Instance path.
    pub address: Address,
    /// Read or write.
    pub direction: Direction,
    /// Written values, or the payload of an outbound update.
    pub values: Vec<TypedValue>,
}

impl NodeStateMessage {
    /// A read request.
    pub fn read(node: NodeId, address: Address) -> Self {
        Self {
            node,
            address,
            direction: Direction::Read,
            values: Vec::new(),
        }
    }

    /// A single-value write.
    pub fn write(node: NodeId, address: Address, value: impl Into<TypedValue>) -> Self {
        Self {
            node,
            address,
            direction: Direction::Write,
            values: vec![value.into()],
        }
    }

    /// An outbound update carrying `values`.
    pub fn update(node: NodeId, address: Address, values: Vec<TypedValue>) -> Self {
        Self {
            node,
            address,
            direction: Direction::Write,
            values,
        }
    }

    /// Whether this is a write.
    pub fn is_write(&self) -> bool {
        self.direction == Direction::Write
    }

    /// Value at position `index`.
    pub fn nth_value(&self, index: usize) -> Option<&TypedValue> {
        self.values.get(index)
    }

    /// Decode a wire frame.
    ///
    /// Returns `Ok(None)` when the node name is not known to this build; such
    /// frames are dropped without error so that newer clients can talk to
    /// older servers.
    pub fn decode(text: &str) -> Result<Option<Self>, DecodeError> {
        let frame: WireFrame = serde_json::from_str(text)?;
        let Ok(node) = frame.node.parse::<NodeId>() else {
            tracing::debug!(node = %frame.node, "dropping frame for unknown node");
            return Ok(None);
        };
        let direction = if frame.values.is_empty() {
            Direction::Read
        } else {
            Direction::Write
        };
        Ok(Some(Self {
            node,
            address: Address::new(frame.address),
            direction,
            values: frame.values,
        }))
    }

    /// Encode as a wire frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&WireFrameRef {
            node: self.node,
            address: &self.address,
            values: &self.values,
        })
    }
}

#[derive(Deserialize)]
struct WireFrame {
    node: String,
    #[serde(default, alias = "addr")]
    address: Vec<u32>,
    #[serde(default, alias = "val")]
    values: Vec<TypedValue>,
}

#[derive(Serialize)]
struct WireFrameRef<'a> {
    node: NodeId,
    address: &'a Address,
    values: &'a [TypedValue],
}
