//! Node identifiers and their tree levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Depth of a node in the session tree. Determines the address length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeLevel {
    /// Session-wide value, empty address.
    Global,
    /// Per-strip value, address `[strip]`.
    Strip,
    /// Per-plugin value, address `[strip, plugin]`.
    Plugin,
    /// Per-parameter value, address `[strip, plugin, parameter]`.
    Parameter,
}

impl NodeLevel {
    /// Number of address components a node at this level requires.
    pub fn address_len(self) -> usize {
        match self {
            Self::Global => 0,
            Self::Strip => 1,
            Self::Plugin => 2,
            Self::Parameter => 3,
        }
    }
}

impl fmt::Display for NodeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "global",
            Self::Strip => "strip",
            Self::Plugin => "plugin",
            Self::Parameter => "parameter",
        })
    }
}

/// Every addressable leaf or descriptor of the session tree.
///
/// The snake_case names are stable wire values and registry keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Session tempo in BPM.
    Tempo,
    /// Strip name (descriptor).
    StripDesc,
    /// Strip gain in dB.
    StripGain,
    /// Strip pan azimuth, 0 (left) to 1 (right).
    StripPan,
    /// Strip mute state.
    StripMute,
    /// Plugin display name (descriptor).
    StripPluginDesc,
    /// Plugin active state.
    StripPluginEnable,
    /// Parameter name and value shape (descriptor).
    StripPluginParamDesc,
    /// Parameter current value.
    StripPluginParamValue,
}

impl NodeId {
    /// All node identifiers, in tree order.
    pub const ALL: [Self; 9] = [
        Self::Tempo,
        Self::StripDesc,
        Self::StripGain,
        Self::StripPan,
        Self::StripMute,
        Self::StripPluginDesc,
        Self::StripPluginEnable,
        Self::StripPluginParamDesc,
        Self::StripPluginParamValue,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tempo => "tempo",
            Self::StripDesc => "strip_desc",
            Self::StripGain => "strip_gain",
            Self::StripPan => "strip_pan",
            Self::StripMute => "strip_mute",
            Self::StripPluginDesc => "strip_plugin_desc",
            Self::StripPluginEnable => "strip_plugin_enable",
            Self::StripPluginParamDesc => "strip_plugin_param_desc",
            Self::StripPluginParamValue => "strip_plugin_param_value",
        }
    }

    /// Tree level of the node.
    pub fn level(self) -> NodeLevel {
        match self {
            Self::Tempo => NodeLevel::Global,
            Self::StripDesc | Self::StripGain | Self::StripPan | Self::StripMute => NodeLevel::Strip,
            Self::StripPluginDesc | Self::StripPluginEnable => NodeLevel::Plugin,
            Self::StripPluginParamDesc | Self::StripPluginParamValue => NodeLevel::Parameter,
        }
    }

    /// Whether the node carries static metadata rather than a live value.
    pub fn is_descriptor(self) -> bool {
        matches!(
            self,
            Self::StripDesc | Self::StripPluginDesc | Self::StripPluginParamDesc
        )
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`NodeId::from_str`] for names this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node '{0}'")]
pub struct UnknownNode(pub String);

impl FromStr for NodeId {
    type Err = UnknownNode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|node| node.as_str() == s)
            .ok_or_else(|| UnknownNode(s.to_owned()))
    }
}
