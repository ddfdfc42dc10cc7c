//! Built-in node handlers.
//!
//! Each handler extracts its address components, then either applies value 0
//! of a write to the session or reads the current value and emits it back to
//! the requesting client.

use mixsync_core::{Address, ClientId, NodeId, NodeStateMessage, TypedValue};

use crate::errors::HandlerError;
use crate::registry::{NodeContext, NodeHandler, NodeRegistry};

/// Register every built-in handler.
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(NodeId::Tempo, TempoHandler);
    registry.register(NodeId::StripGain, StripGainHandler);
    registry.register(NodeId::StripPan, StripPanHandler);
    registry.register(NodeId::StripMute, StripMuteHandler);
    registry.register(NodeId::StripPluginEnable, StripPluginEnableHandler);
    registry.register(NodeId::StripPluginParamValue, StripPluginParamValueHandler);
}

/// The single value of a scalar write.
fn single_value(msg: &NodeStateMessage) -> Result<&TypedValue, HandlerError> {
    match msg.values.as_slice() {
        [value] => Ok(value),
        values => Err(HandlerError::Arity {
            node: msg.node,
            found: values.len(),
        }),
    }
}

/// `tempo`, global.
pub struct TempoHandler;

impl NodeHandler for TempoHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        _msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let bpm = ctx.session.tempo();
        let _ = ctx.update(client, NodeId::Tempo, Address::global(), vec![bpm.into()]);
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let bpm = single_value(msg)?.to_f64()?;
        ctx.session.set_tempo(bpm)?;
        Ok(())
    }
}

/// `strip_gain`, dB at `[strip]`.
pub struct StripGainHandler;

impl NodeHandler for StripGainHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let db = ctx.session.strip_gain(strip)?;
        let _ = ctx.update(client, NodeId::StripGain, Address::strip(strip), vec![db.into()]);
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let db = single_value(msg)?.to_f64()?;
        ctx.session.set_strip_gain(strip, db)?;
        Ok(())
    }
}

/// `strip_pan`, azimuth at `[strip]`.
pub struct StripPanHandler;

impl NodeHandler for StripPanHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let azimuth = ctx.session.strip_pan(strip)?;
        let _ = ctx.update(
            client,
            NodeId::StripPan,
            Address::strip(strip),
            vec![azimuth.into()],
        );
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let azimuth = single_value(msg)?.to_f64()?;
        ctx.session.set_strip_pan(strip, azimuth)?;
        Ok(())
    }
}

/// `strip_mute` at `[strip]`.
pub struct StripMuteHandler;

impl NodeHandler for StripMuteHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let mute = ctx.session.strip_mute(strip)?;
        let _ = ctx.update(client, NodeId::StripMute, Address::strip(strip), vec![mute.into()]);
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let mute = single_value(msg)?.to_bool()?;
        ctx.session.set_strip_mute(strip, mute)?;
        Ok(())
    }
}

/// `strip_plugin_enable` at `[strip, plugin]`.
pub struct StripPluginEnableHandler;

impl NodeHandler for StripPluginEnableHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let plugin = msg.address.nth(1)?;
        let enabled = ctx.session.strip_plugin_enabled(strip, plugin)?;
        let _ = ctx.update(
            client,
            NodeId::StripPluginEnable,
            Address::plugin(strip, plugin),
            vec![enabled.into()],
        );
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let plugin = msg.address.nth(1)?;
        let enabled = single_value(msg)?.to_bool()?;
        ctx.session.set_strip_plugin_enabled(strip, plugin, enabled)?;
        Ok(())
    }
}

/// `strip_plugin_param_value` at `[strip, plugin, parameter]`.
pub struct StripPluginParamValueHandler;

impl NodeHandler for StripPluginParamValueHandler {
    fn read(
        &self,
        ctx: &NodeContext<'_>,
        client: &ClientId,
        msg: &NodeStateMessage,
    ) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let plugin = msg.address.nth(1)?;
        let parameter = msg.address.nth(2)?;
        let value = ctx
            .session
            .strip_plugin_param_value(strip, plugin, parameter)?;
        let _ = ctx.update(
            client,
            NodeId::StripPluginParamValue,
            Address::parameter(strip, plugin, parameter),
            vec![value],
        );
        Ok(())
    }

    fn write(&self, ctx: &NodeContext<'_>, msg: &NodeStateMessage) -> Result<(), HandlerError> {
        let strip = msg.address.nth(0)?;
        let plugin = msg.address.nth(1)?;
        let parameter = msg.address.nth(2)?;
        let value = single_value(msg)?;
        ctx.session
            .set_strip_plugin_param_value(strip, plugin, parameter, value)?;
        Ok(())
    }
}
