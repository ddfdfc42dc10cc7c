//! Full-state synchronization for a newly connected client.
//!
//! The walk emits one update per leaf of the live tree, in this order:
//!
//! 1. `tempo`
//! 2. for each route strip `s`: `strip_desc`, `strip_gain`, `strip_pan`,
//!    `strip_mute` at `[s]`
//! 3. for each plugin insert `p` of that strip: `strip_plugin_desc` and
//!    `strip_plugin_enable` at `[s, p]`
//! 4. for each automatable parameter `k` of that plugin:
//!    `strip_plugin_param_desc` then `strip_plugin_param_value` at `[s, p, k]`
//!
//! There is no terminator message. The topology may change while a walk is
//! running; a strip that faults part way is logged and skipped, and the walk
//! carries on with the next one. A walk whose update the transport rejects
//! stops there: the client's copy is already incomplete.

use std::iter::FusedIterator;
use std::time::Instant;

use metrics::{counter, histogram};
use mixsync_core::{Address, ClientId, NodeId, TypedValue};
use mixsync_session::{FacadeError, PluginInfo, SessionFacade};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::dispatcher::Dispatcher;
use crate::errors::HandlerError;
use crate::metrics::{
    FULL_SYNC_DURATION_SECONDS, FULL_SYNC_REJECTED_TOTAL, FULL_SYNC_TOTAL, FULL_SYNC_UPDATES,
    NODE_HANDLER_FAULTS_TOTAL,
};
use crate::registry::NodeContext;

/// Summary of one full-sync walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Updates the transport accepted.
    pub emitted: usize,
    /// Route strips walked to completion.
    pub strips: u32,
    /// Strips passed over because they are not routes.
    pub skipped: u32,
    /// Strips abandoned part way because of a fault.
    pub faults: u32,
    /// Whether the walk stopped early on cancellation.
    pub cancelled: bool,
    /// Whether the walk stopped because the transport rejected an update.
    pub rejected: bool,
}

impl SyncReport {
    /// Whether the client received the whole tree.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && !self.rejected
    }
}

/// Plugin inserts of one strip, probed at positions `0, 1, 2, …` until the
/// first empty position.
pub struct PluginInserts<'a> {
    session: &'a dyn SessionFacade,
    strip: u32,
    next: Option<u32>,
}

/// Lazily enumerate the plugin inserts of `strip`.
pub fn plugin_inserts(session: &dyn SessionFacade, strip: u32) -> PluginInserts<'_> {
    PluginInserts {
        session,
        strip,
        next: Some(0),
    }
}

impl Iterator for PluginInserts<'_> {
    type Item = (u32, PluginInfo);

    fn next(&mut self) -> Option<Self::Item> {
        let position = self.next?;
        match self.session.strip_plugin_insert(self.strip, position) {
            Some(info) => {
                self.next = position.checked_add(1);
                Some((position, info))
            }
            None => {
                self.next = None;
                None
            }
        }
    }
}

impl FusedIterator for PluginInserts<'_> {}

enum StripOutcome {
    Synced,
    NotRoute,
    Stopped,
}

struct Walk<'a> {
    ctx: NodeContext<'a>,
    client: &'a ClientId,
    cancel: &'a CancellationToken,
    report: SyncReport,
}

impl Walk<'_> {
    /// Nothing is sent once an update has been rejected.
    fn emit(&mut self, node: NodeId, address: Address, values: Vec<TypedValue>) {
        if self.report.rejected {
            return;
        }
        if self.ctx.update(self.client, node, address, values) {
            self.report.emitted += 1;
        } else {
            self.report.rejected = true;
        }
    }

    fn stopped(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.report.cancelled = true;
        }
        self.report.cancelled || self.report.rejected
    }

    fn run(&mut self) {
        if self.stopped() {
            return;
        }
        let tempo = self.ctx.session.tempo();
        self.emit(NodeId::Tempo, Address::global(), vec![tempo.into()]);

        for strip in 0..self.ctx.session.strip_count() {
            if self.stopped() {
                return;
            }
            match self.strip(strip) {
                _ if self.report.rejected => return,
                Ok(StripOutcome::Synced) => self.report.strips += 1,
                Ok(StripOutcome::NotRoute) => self.report.skipped += 1,
                Ok(StripOutcome::Stopped) => return,
                Err(err) => {
                    self.report.faults += 1;
                    let category = err.category();
                    counter!(
                        NODE_HANDLER_FAULTS_TOTAL,
                        "node" => "full_sync",
                        "category" => category
                    )
                    .increment(1);
                    warn!(
                        client_id = %self.client,
                        strip,
                        category,
                        error = %err,
                        "strip faulted during full sync, skipping"
                    );
                }
            }
        }
    }

    fn strip(&mut self, strip: u32) -> Result<StripOutcome, HandlerError> {
        let session = self.ctx.session;
        let info = session
            .nth_strip(strip)
            .ok_or(FacadeError::StripNotFound { strip })?;
        if !info.is_route() {
            return Ok(StripOutcome::NotRoute);
        }

        let address = Address::strip(strip);
        self.emit(NodeId::StripDesc, address.clone(), vec![info.name.into()]);
        let gain = session.strip_gain(strip)?;
        self.emit(NodeId::StripGain, address.clone(), vec![gain.into()]);
        let pan = session.strip_pan(strip)?;
        self.emit(NodeId::StripPan, address.clone(), vec![pan.into()]);
        let mute = session.strip_mute(strip)?;
        self.emit(NodeId::StripMute, address, vec![mute.into()]);

        for (plugin, insert) in plugin_inserts(session, strip) {
            if self.stopped() {
                return Ok(StripOutcome::Stopped);
            }
            let address = Address::plugin(strip, plugin);
            self.emit(NodeId::StripPluginDesc, address.clone(), vec![insert.name.into()]);
            let enabled = session.strip_plugin_enabled(strip, plugin)?;
            self.emit(NodeId::StripPluginEnable, address, vec![enabled.into()]);

            for parameter in 0..insert.parameter_count {
                if self.stopped() {
                    return Ok(StripOutcome::Stopped);
                }
                let Some(control) = session.strip_plugin_param_control(strip, plugin, parameter)
                else {
                    continue;
                };
                let address = Address::parameter(strip, plugin, parameter);
                let descriptor = control
                    .descriptor
                    .shape()
                    .descriptor_values(&control.descriptor.name);
                self.emit(NodeId::StripPluginParamDesc, address.clone(), descriptor);
                let value = session.strip_plugin_param_value(strip, plugin, parameter)?;
                self.emit(NodeId::StripPluginParamValue, address, vec![value]);
            }
        }
        Ok(StripOutcome::Synced)
    }
}

impl Dispatcher {
    /// Send `client` the complete current state of the session.
    ///
    /// Runs synchronously; callers on an async runtime should move it to the
    /// blocking pool. `cancel` is checked before every strip, plugin and
    /// parameter. The walk also stops at the first update the transport
    /// rejects, so `emitted` counts only delivered frames.
    #[instrument(skip_all, fields(client_id = %client))]
    pub fn update_all_nodes(&self, client: &ClientId, cancel: &CancellationToken) -> SyncReport {
        let start = Instant::now();
        let mut walk = Walk {
            ctx: self.context(),
            client,
            cancel,
            report: SyncReport::default(),
        };
        walk.run();
        let report = walk.report;
        let duration = start.elapsed();

        counter!(FULL_SYNC_TOTAL).increment(1);
        if report.rejected {
            counter!(FULL_SYNC_REJECTED_TOTAL).increment(1);
            warn!(
                client_id = %client,
                emitted = report.emitted,
                "transport rejected a full-sync update, walk abandoned"
            );
        }
        #[allow(clippy::cast_precision_loss)]
        let emitted = report.emitted as f64;
        histogram!(FULL_SYNC_UPDATES).record(emitted);
        histogram!(FULL_SYNC_DURATION_SECONDS).record(duration.as_secs_f64());
        info!(
            emitted = report.emitted,
            strips = report.strips,
            skipped = report.skipped,
            faults = report.faults,
            cancelled = report.cancelled,
            rejected = report.rejected,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "full sync finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixsync_session::fixtures::{demo_session, two_strip_session};
    use mixsync_session::{MemoryPlugin, MemorySession, MemoryStrip};

    #[test]
    fn plugin_inserts_stop_at_first_gap() {
        let session = demo_session();
        let names: Vec<_> = plugin_inserts(&session, 0).map(|(_, p)| p.name).collect();
        assert_eq!(names, vec!["EQ", "Gate"]);
        assert_eq!(plugin_inserts(&session, 1).count(), 0);
    }

    #[test]
    fn plugin_inserts_is_fused() {
        let session = MemorySession::new().with_strip(MemoryStrip::route("A"));
        let mut inserts = plugin_inserts(&session, 0);
        assert!(inserts.next().is_none());
        let _ = session.add_plugin(0, MemoryPlugin::new("Late")).unwrap();
        assert!(inserts.next().is_none());
    }

    #[test]
    fn plugin_inserts_positions_are_sequential() {
        let session = demo_session();
        let positions: Vec<_> = plugin_inserts(&session, 0).map(|(p, _)| p).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(plugin_inserts(&two_strip_session(), 0).count(), 1);
    }
}
