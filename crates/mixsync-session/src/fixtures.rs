//! Ready-made sessions for tests and the demonstration daemon.

use mixsync_core::ParameterDescriptor;

use crate::memory::{MemoryPlugin, MemorySession, MemoryStrip};

/// Two routes; the first carries one compressor with two automatable
/// parameters and one output-only parameter, the second has no plugins.
pub fn two_strip_session() -> MemorySession {
    MemorySession::new()
        .with_tempo(120.0)
        .with_strip(
            MemoryStrip::route("Kick").with_gain(-3.0).with_plugin(
                MemoryPlugin::new("Compressor")
                    .with_param(
                        ParameterDescriptor::continuous("Threshold", -60.0, 0.0),
                        -18.0,
                    )
                    .with_param(ParameterDescriptor::toggle("Sidechain"), 0.0)
                    .with_fixed_param(
                        ParameterDescriptor::continuous("Gain Reduction", -60.0, 0.0),
                        0.0,
                    ),
            ),
        )
        .with_strip(MemoryStrip::route("Bass").with_pan(0.4))
}

/// [`two_strip_session`] plus a third route and a VCA master.
pub fn four_strip_session() -> MemorySession {
    let session = two_strip_session();
    let _ = session.add_strip(MemoryStrip::vca("Rhythm"));
    let _ = session.add_strip(MemoryStrip::route("Keys").with_mute(true));
    session
}

/// A small band mix with every parameter shape represented.
pub fn demo_session() -> MemorySession {
    MemorySession::new()
        .with_tempo(96.0)
        .with_strip(
            MemoryStrip::route("Kick")
                .with_gain(-2.0)
                .with_plugin(
                    MemoryPlugin::new("EQ")
                        .with_param(
                            ParameterDescriptor::continuous("Low Freq", 20.0, 500.0)
                                .with_logarithmic(true),
                            60.0,
                        )
                        .with_param(ParameterDescriptor::continuous("Low Gain", -18.0, 18.0), 3.0)
                        .with_param(ParameterDescriptor::enumerated("Low Type", 0.0, 2.0), 1.0),
                )
                .with_plugin(
                    MemoryPlugin::new("Gate")
                        .with_param(ParameterDescriptor::continuous("Threshold", -80.0, 0.0), -40.0)
                        .with_param(ParameterDescriptor::toggle("Lookahead"), 1.0),
                ),
        )
        .with_strip(MemoryStrip::route("Snare").with_pan(0.55))
        .with_strip(
            MemoryStrip::route("Bass").with_gain(-4.5).with_plugin(
                MemoryPlugin::new("Amp Sim")
                    .with_param(ParameterDescriptor::stepped("Cabinet", 0.0, 7.0), 3.0)
                    .with_param(ParameterDescriptor::continuous("Drive", 0.0, 1.0), 0.35)
                    .with_fixed_param(ParameterDescriptor::continuous("Latency", 0.0, 4096.0), 64.0)
                    .with_enabled(false),
            ),
        )
        .with_strip(MemoryStrip::vca("Rhythm"))
        .with_strip(
            MemoryStrip::route("Keys")
                .with_pan(0.3)
                .with_plugin(
                    MemoryPlugin::new("Reverb")
                        .with_param(ParameterDescriptor::continuous("Mix", 0.0, 1.0), 0.25)
                        .with_param(ParameterDescriptor::stepped("Algorithm", 1.0, 4.0), 2.0),
                ),
        )
}
