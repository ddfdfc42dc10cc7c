//! Shared fixtures for protocol integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use mixsync_core::{ClientId, NodeId, NodeStateMessage, TypedValue};
use mixsync_protocol::{Dispatcher, UpdateSink};
use mixsync_session::{
    FacadeConcurrency, FacadeError, MemorySession, ParamControl, PluginInfo, SessionFacade,
    StripInfo,
};
use parking_lot::Mutex;

/// Transport that records every update it is handed.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(ClientId, NodeStateMessage)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<NodeStateMessage> {
        self.sent.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn for_client(&self, client: &ClientId) -> Vec<NodeStateMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|(c, _)| c == client)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        self.sent.lock().iter().map(|(_, m)| m.node).collect()
    }

    pub fn count(&self, node: NodeId) -> usize {
        self.sent.lock().iter().filter(|(_, m)| m.node == node).count()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl UpdateSink for RecordingSink {
    fn update_client(&self, client: &ClientId, message: NodeStateMessage, _flush: bool) -> bool {
        self.sent.lock().push((client.clone(), message));
        true
    }
}

/// Dispatcher over the global registry with a recording transport.
pub fn dispatcher_for<S: SessionFacade + 'static>(session: Arc<S>) -> (Dispatcher, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let dispatcher = Dispatcher::new(session, Arc::clone(&sink) as Arc<dyn UpdateSink>);
    (dispatcher, sink)
}

/// Session whose strip `broken` loses its panner: every pan query fails as
/// if the strip had been removed between two facade calls.
pub struct FlakySession {
    pub inner: MemorySession,
    pub broken: u32,
}

impl SessionFacade for FlakySession {
    fn concurrency(&self) -> FacadeConcurrency {
        self.inner.concurrency()
    }
    fn tempo(&self) -> f64 {
        self.inner.tempo()
    }
    fn set_tempo(&self, bpm: f64) -> Result<(), FacadeError> {
        self.inner.set_tempo(bpm)
    }
    fn strip_count(&self) -> u32 {
        self.inner.strip_count()
    }
    fn nth_strip(&self, strip: u32) -> Option<StripInfo> {
        self.inner.nth_strip(strip)
    }
    fn strip_gain(&self, strip: u32) -> Result<f64, FacadeError> {
        self.inner.strip_gain(strip)
    }
    fn set_strip_gain(&self, strip: u32, db: f64) -> Result<(), FacadeError> {
        self.inner.set_strip_gain(strip, db)
    }
    fn strip_pan(&self, strip: u32) -> Result<f64, FacadeError> {
        if strip == self.broken {
            return Err(FacadeError::StripNotFound { strip });
        }
        self.inner.strip_pan(strip)
    }
    fn set_strip_pan(&self, strip: u32, azimuth: f64) -> Result<(), FacadeError> {
        self.inner.set_strip_pan(strip, azimuth)
    }
    fn strip_mute(&self, strip: u32) -> Result<bool, FacadeError> {
        self.inner.strip_mute(strip)
    }
    fn set_strip_mute(&self, strip: u32, mute: bool) -> Result<(), FacadeError> {
        self.inner.set_strip_mute(strip, mute)
    }
    fn strip_plugin_insert(&self, strip: u32, plugin: u32) -> Option<PluginInfo> {
        self.inner.strip_plugin_insert(strip, plugin)
    }
    fn strip_plugin_enabled(&self, strip: u32, plugin: u32) -> Result<bool, FacadeError> {
        self.inner.strip_plugin_enabled(strip, plugin)
    }
    fn set_strip_plugin_enabled(
        &self,
        strip: u32,
        plugin: u32,
        enabled: bool,
    ) -> Result<(), FacadeError> {
        self.inner.set_strip_plugin_enabled(strip, plugin, enabled)
    }
    fn strip_plugin_param_control(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Option<ParamControl> {
        self.inner.strip_plugin_param_control(strip, plugin, parameter)
    }
    fn strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
    ) -> Result<TypedValue, FacadeError> {
        self.inner.strip_plugin_param_value(strip, plugin, parameter)
    }
    fn set_strip_plugin_param_value(
        &self,
        strip: u32,
        plugin: u32,
        parameter: u32,
        value: &TypedValue,
    ) -> Result<(), FacadeError> {
        self.inner
            .set_strip_plugin_param_value(strip, plugin, parameter, value)
    }
}
