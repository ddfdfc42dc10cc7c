//! # mixsyncd
//!
//! Loads settings, starts the WebSocket server over an in-memory
//! demonstration session, and runs until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mixsync_core::logging::{init_json_subscriber, init_subscriber};
use mixsync_server::{MixsyncServer, ServerConfig};
use mixsync_session::SessionFacade;
use mixsync_session::fixtures::demo_session;
use mixsync_settings::{LogFormat, MixsyncSettings};

/// mixsync control-surface server.
#[derive(Parser, Debug)]
#[command(name = "mixsyncd", about = "Mirror a mixer session to WebSocket control surfaces")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Maximum concurrent clients (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Settings file [default: ~/.mixsync/settings.json].
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `mixsync_protocol=trace` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs.
    #[arg(long)]
    json_logs: bool,

    /// Seconds to wait for background tasks on shutdown.
    #[arg(long, default_value = "10")]
    shutdown_timeout: u64,
}

impl Cli {
    fn load_settings(&self) -> Result<MixsyncSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(mixsync_settings::settings_path);
        let mut settings = mixsync_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        mixsync_settings::validate(&settings).context("Invalid command-line overrides")?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut MixsyncSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
    }
}

fn init_logging(settings: &MixsyncSettings) {
    match settings.logging.format {
        LogFormat::Compact => init_subscriber(&settings.logging.level),
        LogFormat::Json => init_json_subscriber(&settings.logging.level),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;
    init_logging(&settings);

    let session = Arc::new(demo_session());
    tracing::info!(
        strips = session.strip_count(),
        tempo = session.tempo(),
        "demo session ready"
    );

    let mut server = MixsyncServer::new(ServerConfig::from(&settings.server), session);
    match mixsync_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(err) => tracing::warn!(error = %err, "metrics disabled"),
    }

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("mixsyncd listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown(Some(Duration::from_secs(args.shutdown_timeout)))
        .await;
    let _ = handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}
