//! The session facade: everything the protocol needs from the engine.

use mixsync_core::{NodeStateMessage, ParameterDescriptor, TypedValue};
use tokio::sync::broadcast;

use crate::errors::FacadeError;

/// How a facade synchronizes access to the session it wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacadeConcurrency {
    /// Concurrent readers, one writer at a time. Calls may take a short
    /// lock but never wait on the audio thread.
    SharedReadSerializedWrite,
    /// Mutations are queued to the engine and applied asynchronously; reads
    /// observe a published snapshot.
    MessagePassing,
}

/// What kind of object a strip is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StripKind {
    /// Audio/MIDI route with plugins and panner.
    Route,
    /// Control-only strip (VCA master). Not mirrored by full sync.
    Vca,
}

/// Strip resolved by [`SessionFacade::nth_strip`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StripInfo {
    /// Display name.
    pub name: String,
    /// Strip kind.
    pub kind: StripKind,
}

impl StripInfo {
    /// Whether the strip is a route.
    pub fn is_route(&self) -> bool {
        self.kind == StripKind::Route
    }
}

/// Plugin insert resolved by [`SessionFacade::strip_plugin_insert`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    /// Display name.
    pub name: String,
    /// Number of parameters, automatable or not.
    pub parameter_count: u32,
}

/// Automatable control of a plugin parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamControl {
    /// Parameter metadata.
    pub descriptor: ParameterDescriptor,
}

/// Synchronous, non-blocking view of a live session.
///
/// Implementations are shared between connection tasks and blocking-pool
/// sync walks, hence `Send + Sync`. No method may block on the real-time
/// thread; [`SessionFacade::concurrency`] states how that is achieved.
pub trait SessionFacade: Send + Sync {
    /// Concurrency model of this facade.
    fn concurrency(&self) -> FacadeConcurrency;

    /// Tempo in BPM.
    fn tempo(&self) -> f64;

    /// Set the tempo in BPM.
    fn set_tempo(&self, bpm: f64) -> Result<(), FacadeError>;

    /// Number of strips, routes and others.
    fn strip_count(&self) -> u32;

    /// Strip at `strip`, or `None` when out of range.
    fn nth_strip(&self, strip: u32) -> Option<StripInfo>;

    /// Gain in dB.
    fn strip_gain(&self, strip: u32) -> Result<f64, FacadeError>;

    /// Set the gain in dB.
    fn set_strip_gain(&self, strip: u32, db: f64) -> Result<(), FacadeError>;

    /// Pan azimuth, 0 (left) to 1 (right).
    fn strip_pan(&self, strip: u32) -> Result<f64, FacadeError>;

    /// Set the pan azimuth.
    fn set_strip_pan(&self, strip: u32, azimuth: f64) -> Result<(), FacadeError>;

    /// Mute state.
    fn strip_mute(&self, strip: u32) -> Result<bool, FacadeError>;

    /// Set the mute state.
    fn set_strip_mute(&self, strip: u32, mute: bool) -> Result<(), FacadeError>;

    /// Plugin insert at `plugin` on `strip`, or `None` past the end of the chain.
    fn strip_plugin_insert(&self, strip: u32, plugin: u32) -> Option<PluginInfo>;

    /// Whether the plugin is active.
    fn strip_plugin_enabled(&self, strip: u32, plugin: u32) -> Result<bool, FacadeError>;

    /// Activate or bypass the plugin.
    fn set_strip_plugin_enabled(
        &self,
        strip: u32,
        plugin: u32,
        enabled: bool,
    ) -> Result<(), FacadeError>;

    /// Automatable control of a parameter, or `None` when absent or not automatable.
    fn strip_plugin_param_control(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Option<ParamControl>;

    /// Current parameter value, shaped after its descriptor.
    fn strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Result<TypedValue, FacadeError>;

    /// Set a parameter value. The value is coerced to the descriptor's shape.
    fn set_strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
        value: &TypedValue,
    ) -> Result<(), FacadeError>;
}

/// Source of change notifications, one per successful mutation.
///
/// Each notification is an update-shaped [`NodeStateMessage`] carrying the
/// value as stored (after clamping), whoever made the change.
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to subsequent changes.
    fn subscribe(&self) -> broadcast::Receiver<NodeStateMessage>;
}
