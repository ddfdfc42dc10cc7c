//! Error types for the value, address and wire layers.

use thiserror::Error;

use crate::node::NodeLevel;
use crate::value::ValueKind;

/// A [`TypedValue`](crate::TypedValue) could not be interpreted as the
/// requested kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// Text payload does not parse as the expected kind.
    #[error("cannot read {text:?} as {expected}")]
    Unparseable {
        /// Kind the caller asked for.
        expected: ValueKind,
        /// Offending text.
        text: String,
    },
    /// Value is NaN or infinite where a finite number is required.
    #[error("value is not a finite number")]
    NotFinite,
}

/// An [`Address`](crate::Address) does not fit the node it was sent with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Wrong number of index components for the node's level.
    #[error("{level} node expects {expected} address components, got {found}")]
    Arity {
        /// Level of the addressed node.
        level: NodeLevel,
        /// Required length.
        expected: usize,
        /// Supplied length.
        found: usize,
    },
    /// Component index beyond the address length.
    #[error("address has no component {index}")]
    MissingComponent {
        /// Requested component position.
        index: usize,
    },
}

/// A wire frame could not be decoded into a node message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame is not valid JSON or has the wrong shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}
