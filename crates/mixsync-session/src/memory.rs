//! In-memory session model.
//!
//! [`MemorySession`] backs the daemon's demonstration session and every
//! protocol test. State lives behind one `parking_lot::RwLock`, so reads run
//! concurrently and writes are serialized. Setters publish their change while
//! still holding the write lock, so the change feed carries writes in the same
//! order they were applied. `broadcast::Sender::send` never blocks, and no
//! call holds the lock across an await point.

use std::ops::RangeInclusive;

use mixsync_core::{Address, NodeId, NodeStateMessage, ParameterDescriptor, TypedValue, ValueShape};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::errors::FacadeError;
use crate::facade::{
    ChangeFeed, FacadeConcurrency, ParamControl, PluginInfo, SessionFacade, StripInfo, StripKind,
};

/// Accepted tempo range in BPM.
pub const TEMPO_RANGE: RangeInclusive<f64> = 20.0..=300.0;

/// Accepted gain range in dB. The lower end is treated as silence.
pub const GAIN_RANGE_DB: RangeInclusive<f64> = -192.0..=6.0;

/// Accepted pan azimuth range.
pub const PAN_RANGE: RangeInclusive<f64> = 0.0..=1.0;

const DEFAULT_TEMPO: f64 = 120.0;
const CHANGE_CAPACITY: usize = 1024;

/// A plugin parameter and its current value.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryParam {
    descriptor: ParameterDescriptor,
    automatable: bool,
    value: f64,
}

impl MemoryParam {
    /// Current value shaped after the descriptor.
    fn typed_value(&self) -> TypedValue {
        match self.descriptor.shape() {
            ValueShape::Toggle => TypedValue::Bool(self.value >= 0.5),
            ValueShape::Stepped { .. } => {
                let v = TypedValue::Double(self.value);
                v.to_i64().map_or(v, TypedValue::Int)
            }
            ValueShape::Continuous { .. } => TypedValue::Double(self.value),
        }
    }

    /// Convert an incoming value to the stored representation.
    fn coerce(&self, value: &TypedValue) -> Result<f64, FacadeError> {
        match self.descriptor.shape() {
            ValueShape::Toggle => Ok(if value.to_bool()? { 1.0 } else { 0.0 }),
            ValueShape::Stepped { lower, upper, step } => {
                let v = finite(value.to_f64()?)?;
                let snapped = lower + ((v - lower) / step).round() * step;
                Ok(clamp(snapped, lower, upper))
            }
            ValueShape::Continuous { lower, upper, .. } => {
                let v = finite(value.to_f64()?)?;
                Ok(clamp(v, lower, upper))
            }
        }
    }
}

/// A plugin insert.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryPlugin {
    name: String,
    enabled: bool,
    params: Vec<MemoryParam>,
}

impl MemoryPlugin {
    /// An active plugin with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            params: Vec::new(),
        }
    }

    /// Set the active state.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Append an automatable parameter.
    #[must_use]
    pub fn with_param(mut self, descriptor: ParameterDescriptor, value: f64) -> Self {
        self.params.push(MemoryParam {
            descriptor,
            automatable: true,
            value,
        });
        self
    }

    /// Append a parameter without an automatable control, e.g. a latency
    /// report or other output-only port.
    #[must_use]
    pub fn with_fixed_param(mut self, descriptor: ParameterDescriptor, value: f64) -> Self {
        self.params.push(MemoryParam {
            descriptor,
            automatable: false,
            value,
        });
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A mixer strip.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryStrip {
    name: String,
    kind: StripKind,
    gain_db: f64,
    pan: f64,
    mute: bool,
    plugins: Vec<MemoryPlugin>,
}

impl MemoryStrip {
    /// A route at unity gain, centred, unmuted.
    pub fn route(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: StripKind::Route,
            gain_db: 0.0,
            pan: 0.5,
            mute: false,
            plugins: Vec::new(),
        }
    }

    /// A VCA master.
    pub fn vca(name: impl Into<String>) -> Self {
        Self {
            kind: StripKind::Vca,
            ..Self::route(name)
        }
    }

    /// Set the gain in dB.
    #[must_use]
    pub fn with_gain(mut self, db: f64) -> Self {
        self.gain_db = clamp_range(db, &GAIN_RANGE_DB);
        self
    }

    /// Set the pan azimuth.
    #[must_use]
    pub fn with_pan(mut self, azimuth: f64) -> Self {
        self.pan = clamp_range(azimuth, &PAN_RANGE);
        self
    }

    /// Set the mute state.
    #[must_use]
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }

    /// Append a plugin to the insert chain.
    #[must_use]
    pub fn with_plugin(mut self, plugin: MemoryPlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct SessionState {
    tempo: f64,
    strips: Vec<MemoryStrip>,
}

impl SessionState {
    fn strip(&self, strip: u32) -> Result<&MemoryStrip, FacadeError> {
        self.strips
            .get(strip as usize)
            .ok_or(FacadeError::StripNotFound { strip })
    }

    fn strip_mut(&mut self, strip: u32) -> Result<&mut MemoryStrip, FacadeError> {
        self.strips
            .get_mut(strip as usize)
            .ok_or(FacadeError::StripNotFound { strip })
    }

    fn plugin(&self, strip: u32, plugin: u32) -> Result<&MemoryPlugin, FacadeError> {
        self.strip(strip)?
            .plugins
            .get(plugin as usize)
            .ok_or(FacadeError::PluginNotFound { strip, plugin })
    }

    fn plugin_mut(&mut self, strip: u32, plugin: u32) -> Result<&mut MemoryPlugin, FacadeError> {
        self.strip_mut(strip)?
            .plugins
            .get_mut(plugin as usize)
            .ok_or(FacadeError::PluginNotFound { strip, plugin })
    }

    fn param(&self, strip: u32, plugin: u32, parameter: u32) -> Result<&MemoryParam, FacadeError> {
        let param = self
            .plugin(strip, plugin)?
            .params
            .get(parameter as usize)
            .ok_or(FacadeError::ParameterNotFound {
                strip,
                plugin,
                parameter,
            })?;
        if param.automatable {
            Ok(param)
        } else {
            Err(FacadeError::NotAutomatable {
                strip,
                plugin,
                parameter,
            })
        }
    }

    fn param_mut(
        &mut self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Result<&mut MemoryParam, FacadeError> {
        let param = self
            .plugin_mut(strip, plugin)?
            .params
            .get_mut(parameter as usize)
            .ok_or(FacadeError::ParameterNotFound {
                strip,
                plugin,
                parameter,
            })?;
        if param.automatable {
            Ok(param)
        } else {
            Err(FacadeError::NotAutomatable {
                strip,
                plugin,
                parameter,
            })
        }
    }
}

/// Session held entirely in memory.
pub struct MemorySession {
    state: RwLock<SessionState>,
    changes: broadcast::Sender<NodeStateMessage>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// An empty session at 120 BPM.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            state: RwLock::new(SessionState {
                tempo: DEFAULT_TEMPO,
                strips: Vec::new(),
            }),
            changes,
        }
    }

    /// Set the initial tempo.
    #[must_use]
    pub fn with_tempo(self, bpm: f64) -> Self {
        self.state.write().tempo = clamp_range(bpm, &TEMPO_RANGE);
        self
    }

    /// Append a strip.
    #[must_use]
    pub fn with_strip(self, strip: MemoryStrip) -> Self {
        let _ = self.add_strip(strip);
        self
    }

    /// Append a strip, returning its index.
    pub fn add_strip(&self, strip: MemoryStrip) -> u32 {
        let mut state = self.state.write();
        state.strips.push(strip);
        index_of_last(state.strips.len())
    }

    /// Remove a strip. Strips after it shift down by one.
    pub fn remove_strip(&self, strip: u32) -> Result<MemoryStrip, FacadeError> {
        let mut state = self.state.write();
        if (strip as usize) < state.strips.len() {
            let removed = state.strips.remove(strip as usize);
            debug!(strip, name = %removed.name, "strip removed");
            Ok(removed)
        } else {
            Err(FacadeError::StripNotFound { strip })
        }
    }

    /// Append a plugin to a strip's insert chain, returning its position.
    pub fn add_plugin(&self, strip: u32, plugin: MemoryPlugin) -> Result<u32, FacadeError> {
        let mut state = self.state.write();
        let target = state.strip_mut(strip)?;
        target.plugins.push(plugin);
        Ok(index_of_last(target.plugins.len()))
    }

    /// Remove a plugin. Later inserts shift down by one.
    pub fn remove_plugin(&self, strip: u32, plugin: u32) -> Result<MemoryPlugin, FacadeError> {
        let mut state = self.state.write();
        let target = state.strip_mut(strip)?;
        if (plugin as usize) < target.plugins.len() {
            Ok(target.plugins.remove(plugin as usize))
        } else {
            Err(FacadeError::PluginNotFound { strip, plugin })
        }
    }

    /// Callers hold the write guard so feed order matches write order.
    fn publish(&self, node: NodeId, address: Address, value: TypedValue) {
        // No subscribers is not an error.
        let _ = self
            .changes
            .send(NodeStateMessage::update(node, address, vec![value]));
    }
}

impl ChangeFeed for MemorySession {
    fn subscribe(&self) -> broadcast::Receiver<NodeStateMessage> {
        self.changes.subscribe()
    }
}

impl SessionFacade for MemorySession {
    fn concurrency(&self) -> FacadeConcurrency {
        FacadeConcurrency::SharedReadSerializedWrite
    }

    fn tempo(&self) -> f64 {
        self.state.read().tempo
    }

    fn set_tempo(&self, bpm: f64) -> Result<(), FacadeError> {
        let bpm = clamp_range(finite(bpm)?, &TEMPO_RANGE);
        let mut state = self.state.write();
        state.tempo = bpm;
        self.publish(NodeId::Tempo, Address::global(), TypedValue::Double(bpm));
        Ok(())
    }

    fn strip_count(&self) -> u32 {
        u32::try_from(self.state.read().strips.len()).unwrap_or(u32::MAX)
    }

    fn nth_strip(&self, strip: u32) -> Option<StripInfo> {
        self.state.read().strip(strip).ok().map(|s| StripInfo {
            name: s.name.clone(),
            kind: s.kind,
        })
    }

    fn strip_gain(&self, strip: u32) -> Result<f64, FacadeError> {
        Ok(self.state.read().strip(strip)?.gain_db)
    }

    fn set_strip_gain(&self, strip: u32, db: f64) -> Result<(), FacadeError> {
        let db = clamp_range(finite(db)?, &GAIN_RANGE_DB);
        let mut state = self.state.write();
        state.strip_mut(strip)?.gain_db = db;
        self.publish(NodeId::StripGain, Address::strip(strip), TypedValue::Double(db));
        Ok(())
    }

    fn strip_pan(&self, strip: u32) -> Result<f64, FacadeError> {
        Ok(self.state.read().strip(strip)?.pan)
    }

    fn set_strip_pan(&self, strip: u32, azimuth: f64) -> Result<(), FacadeError> {
        let azimuth = clamp_range(finite(azimuth)?, &PAN_RANGE);
        let mut state = self.state.write();
        state.strip_mut(strip)?.pan = azimuth;
        self.publish(
            NodeId::StripPan,
            Address::strip(strip),
            TypedValue::Double(azimuth),
        );
        Ok(())
    }

    fn strip_mute(&self, strip: u32) -> Result<bool, FacadeError> {
        Ok(self.state.read().strip(strip)?.mute)
    }

    fn set_strip_mute(&self, strip: u32, mute: bool) -> Result<(), FacadeError> {
        let mut state = self.state.write();
        state.strip_mut(strip)?.mute = mute;
        self.publish(NodeId::StripMute, Address::strip(strip), TypedValue::Bool(mute));
        Ok(())
    }

    fn strip_plugin_insert(&self, strip: u32, plugin: u32) -> Option<PluginInfo> {
        self.state.read().plugin(strip, plugin).ok().map(|p| PluginInfo {
            name: p.name.clone(),
            parameter_count: u32::try_from(p.params.len()).unwrap_or(u32::MAX),
        })
    }

    fn strip_plugin_enabled(&self, strip: u32, plugin: u32) -> Result<bool, FacadeError> {
        Ok(self.state.read().plugin(strip, plugin)?.enabled)
    }

    fn set_strip_plugin_enabled(
        &self,
        strip: u32,
        plugin: u32,
        enabled: bool,
    ) -> Result<(), FacadeError> {
        let mut state = self.state.write();
        state.plugin_mut(strip, plugin)?.enabled = enabled;
        self.publish(
            NodeId::StripPluginEnable,
            Address::plugin(strip, plugin),
            TypedValue::Bool(enabled),
        );
        Ok(())
    }

    fn strip_plugin_param_control(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Option<ParamControl> {
        self.state
            .read()
            .param(strip, plugin, parameter)
            .ok()
            .map(|p| ParamControl {
                descriptor: p.descriptor.clone(),
            })
    }

    fn strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Result<TypedValue, FacadeError> {
        Ok(self
            .state
            .read()
            .param(strip, plugin, parameter)?
            .typed_value())
    }

    fn set_strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
        value: &TypedValue,
    ) -> Result<(), FacadeError> {
        let mut state = self.state.write();
        let param = state.param_mut(strip, plugin, parameter)?;
        param.value = param.coerce(value)?;
        let stored = param.typed_value();
        self.publish(
            NodeId::StripPluginParamValue,
            Address::parameter(strip, plugin, parameter),
            stored,
        );
        Ok(())
    }
}

fn finite(v: f64) -> Result<f64, FacadeError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FacadeError::NotFinite)
    }
}

/// Clamp without panicking on inverted bounds.
fn clamp(v: f64, lower: f64, upper: f64) -> f64 {
    v.max(lower).min(upper)
}

fn clamp_range(v: f64, range: &RangeInclusive<f64>) -> f64 {
    clamp(v, *range.start(), *range.end())
}

fn index_of_last(len: usize) -> u32 {
    u32::try_from(len.saturating_sub(1)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn session() -> MemorySession {
        MemorySession::new()
            .with_tempo(100.0)
            .with_strip(
                MemoryStrip::route("Kick").with_gain(-3.0).with_plugin(
                    MemoryPlugin::new("Comp")
                        .with_param(ParameterDescriptor::continuous("Threshold", -60.0, 0.0), -20.0)
                        .with_param(ParameterDescriptor::toggle("Sidechain"), 0.0)
                        .with_param(ParameterDescriptor::stepped("Ratio", 1.0, 20.0), 4.0)
                        .with_fixed_param(ParameterDescriptor::continuous("Latency", 0.0, 1e4), 64.0),
                ),
            )
            .with_strip(MemoryStrip::vca("Drums"))
    }

    #[test]
    fn reports_shared_read_serialized_write() {
        assert_eq!(
            session().concurrency(),
            FacadeConcurrency::SharedReadSerializedWrite
        );
    }

    #[test]
    fn strips_resolve_by_index() {
        let s = session();
        assert_eq!(s.strip_count(), 2);
        assert!(s.nth_strip(0).unwrap().is_route());
        assert_eq!(s.nth_strip(1).unwrap().kind, StripKind::Vca);
        assert!(s.nth_strip(2).is_none());
    }

    #[test]
    fn gain_is_clamped() {
        let s = session();
        s.set_strip_gain(0, 40.0).unwrap();
        assert!((s.strip_gain(0).unwrap() - 6.0).abs() < f64::EPSILON);
        s.set_strip_gain(0, -1000.0).unwrap();
        assert!((s.strip_gain(0).unwrap() + 192.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_is_rejected() {
        let s = session();
        assert_matches!(s.set_tempo(f64::NAN), Err(FacadeError::NotFinite));
        assert_matches!(s.set_strip_pan(0, f64::INFINITY), Err(FacadeError::NotFinite));
        assert!((s.tempo() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_strip_is_error() {
        let s = session();
        assert_matches!(s.strip_gain(999), Err(FacadeError::StripNotFound { strip: 999 }));
        assert_matches!(
            s.set_strip_mute(5, true),
            Err(FacadeError::StripNotFound { strip: 5 })
        );
    }

    #[test]
    fn plugin_inserts_end_at_first_gap() {
        let s = session();
        let comp = s.strip_plugin_insert(0, 0).unwrap();
        assert_eq!(comp.name, "Comp");
        assert_eq!(comp.parameter_count, 4);
        assert!(s.strip_plugin_insert(0, 1).is_none());
        assert!(s.strip_plugin_insert(1, 0).is_none());
    }

    #[test]
    fn fixed_param_has_no_control() {
        let s = session();
        assert!(s.strip_plugin_param_control(0, 0, 0).is_some());
        assert!(s.strip_plugin_param_control(0, 0, 3).is_none());
        assert_matches!(
            s.strip_plugin_param_value(0, 0, 3),
            Err(FacadeError::NotAutomatable { parameter: 3, .. })
        );
    }

    #[test]
    fn param_values_follow_shape() {
        let s = session();
        assert_eq!(s.strip_plugin_param_value(0, 0, 0).unwrap(), TypedValue::Double(-20.0));
        assert_eq!(s.strip_plugin_param_value(0, 0, 1).unwrap(), TypedValue::Bool(false));
        assert_eq!(s.strip_plugin_param_value(0, 0, 2).unwrap(), TypedValue::Int(4));
    }

    #[test]
    fn param_writes_are_coerced() {
        let s = session();
        s.set_strip_plugin_param_value(0, 0, 1, &TypedValue::Int(1)).unwrap();
        assert_eq!(s.strip_plugin_param_value(0, 0, 1).unwrap(), TypedValue::Bool(true));

        s.set_strip_plugin_param_value(0, 0, 2, &TypedValue::Double(6.6)).unwrap();
        assert_eq!(s.strip_plugin_param_value(0, 0, 2).unwrap(), TypedValue::Int(7));

        s.set_strip_plugin_param_value(0, 0, 0, &TypedValue::from("12")).unwrap();
        assert_eq!(s.strip_plugin_param_value(0, 0, 0).unwrap(), TypedValue::Double(0.0));

        assert_matches!(
            s.set_strip_plugin_param_value(0, 0, 0, &TypedValue::from("loud")),
            Err(FacadeError::InvalidValue(_))
        );
    }

    #[test]
    fn change_feed_carries_stored_value() {
        let s = session();
        let mut rx = s.subscribe();
        s.set_strip_pan(0, 3.0).unwrap();
        s.set_strip_plugin_enabled(0, 0, false).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.node, NodeId::StripPan);
        assert_eq!(first.address, Address::strip(0));
        assert_eq!(first.values, vec![TypedValue::Double(1.0)]);

        let second = rx.try_recv().unwrap();
        assert_eq!(
            second,
            NodeStateMessage::update(
                NodeId::StripPluginEnable,
                Address::plugin(0, 0),
                vec![TypedValue::Bool(false)]
            )
        );
    }

    #[test]
    fn failed_write_publishes_nothing() {
        let s = session();
        let mut rx = s.subscribe();
        let _ = s.set_strip_gain(9, 0.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn topology_mutation_shifts_indices() {
        let s = session();
        let keys = s.add_strip(MemoryStrip::route("Keys"));
        assert_eq!(keys, 2);

        let removed = s.remove_strip(0).unwrap();
        assert_eq!(removed.name(), "Kick");
        assert_eq!(s.nth_strip(1).unwrap().name, "Keys");
        assert_matches!(s.remove_strip(7), Err(FacadeError::StripNotFound { strip: 7 }));

        let pos = s.add_plugin(1, MemoryPlugin::new("Reverb")).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(s.remove_plugin(1, 0).unwrap().name(), "Reverb");
        assert_matches!(
            s.remove_plugin(1, 0),
            Err(FacadeError::PluginNotFound { strip: 1, plugin: 0 })
        );
    }
}
