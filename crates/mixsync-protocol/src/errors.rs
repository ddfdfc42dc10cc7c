//! Handler errors.

use mixsync_core::{AddressError, NodeId, ValueError};
use mixsync_session::FacadeError;
use thiserror::Error;

/// Why a node handler could not complete.
///
/// Never leaves the dispatcher: the single call site logs it, counts it
/// under [`HandlerError::category`], and drops the message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// Address does not fit the node.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// Write carried the wrong number of values.
    #[error("write to {node} expects exactly one value, got {found}")]
    Arity {
        /// Target node.
        node: NodeId,
        /// Number of values supplied.
        found: usize,
    },
    /// Value could not be coerced to what the node expects.
    #[error(transparent)]
    Value(#[from] ValueError),
    /// Session rejected the query or mutation.
    #[error(transparent)]
    Facade(#[from] FacadeError),
}

impl HandlerError {
    /// Stable, machine-readable category, used as a metrics label.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Arity { .. } => "arity",
            Self::Value(_)
            | Self::Facade(FacadeError::NotFinite | FacadeError::InvalidValue(_)) => "value",
            Self::Facade(
                FacadeError::StripNotFound { .. }
                | FacadeError::PluginNotFound { .. }
                | FacadeError::ParameterNotFound { .. },
            ) => "not_found",
            Self::Facade(FacadeError::NotAutomatable { .. }) => "not_automatable",
        }
    }
}
