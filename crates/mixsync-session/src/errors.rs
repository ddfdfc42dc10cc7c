//! Session facade errors.

use mixsync_core::ValueError;
use thiserror::Error;

/// A facade query or mutation could not be carried out.
///
/// Lookups by index fail with the `*NotFound` variants when the topology
/// changed since the index was derived.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FacadeError {
    /// No strip at this index.
    #[error("strip {strip} not found")]
    StripNotFound {
        /// Strip index.
        strip: u32,
    },
    /// No plugin insert at this position.
    #[error("plugin {plugin} not found on strip {strip}")]
    PluginNotFound {
        /// Strip index.
        strip: u32,
        /// Insert position.
        plugin: u32,
    },
    /// No parameter at this index.
    #[error("parameter {parameter} not found on plugin {plugin} of strip {strip}")]
    ParameterNotFound {
        /// Strip index.
        strip: u32,
        /// Insert position.
        plugin: u32,
        /// Parameter index.
        parameter: u32,
    },
    /// Parameter exists but exposes no automatable control.
    #[error("parameter {parameter} on plugin {plugin} of strip {strip} is not automatable")]
    NotAutomatable {
        /// Strip index.
        strip: u32,
        /// Insert position.
        plugin: u32,
        /// Parameter index.
        parameter: u32,
    },
    /// NaN or infinite value supplied to a mutation.
    #[error("value is not a finite number")]
    NotFinite,
    /// Supplied value cannot be converted to the target shape.
    #[error(transparent)]
    InvalidValue(#[from] ValueError),
}
