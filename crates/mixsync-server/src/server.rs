//! `MixsyncServer`: Axum HTTP + WebSocket front end.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use mixsync_core::ClientId;
use mixsync_protocol::Dispatcher;
use mixsync_session::{ChangeFeed, SessionFacade};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::feedback::FeedbackBridge;
use crate::websocket::hub::ClientHub;
use crate::websocket::session::{SessionDeps, run_ws_session};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    /// Connected clients.
    pub hub: Arc<ClientHub>,
    /// Protocol entry point.
    pub dispatcher: Dispatcher,
    /// Limits and heartbeat timing.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server was created.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            dispatcher: self.dispatcher.clone(),
            hub: Arc::clone(&self.hub),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

/// The mixsync server.
///
/// Owns the client hub, a dispatcher whose transport is that hub, and the
/// session's change feed. Nothing runs until [`listen`](Self::listen).
pub struct MixsyncServer {
    config: Arc<ServerConfig>,
    hub: Arc<ClientHub>,
    dispatcher: Dispatcher,
    feed: Arc<dyn ChangeFeed>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl MixsyncServer {
    /// Server mirroring `session`.
    pub fn new<S>(config: ServerConfig, session: Arc<S>) -> Self
    where
        S: SessionFacade + ChangeFeed + 'static,
    {
        let hub = Arc::new(ClientHub::new());
        let dispatcher = Dispatcher::new(session.clone(), hub.clone());
        Self {
            config: Arc::new(config),
            hub,
            dispatcher,
            feed: session,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            dispatcher: self.dispatcher.clone(),
            config: Arc::clone(&self.config),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and start serving.
    ///
    /// Also starts the feedback bridge. Both tasks stop when
    /// [`shutdown`](Self::shutdown) is called.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;

        let bridge = FeedbackBridge::new(self.feed.subscribe(), Arc::clone(&self.hub));
        self.shutdown
            .track(tokio::spawn(bridge.run(self.shutdown.token())));

        let router = self.router();
        let token = self.shutdown.token();
        let serve = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = result {
                error!(error = %err, "server exited with error");
            }
        });

        info!(%addr, max_connections = self.config.max_connections, "mixsync server listening");
        Ok((addr, serve))
    }

    /// Stop accepting clients, cancel running syncs and wait for background
    /// tasks.
    pub async fn shutdown(&self, timeout: Option<Duration>) {
        info!(connections = self.hub.connection_count(), "shutting down");
        self.hub.cancel_all_syncs();
        self.shutdown.graceful_shutdown(timeout).await;
    }

    /// Connected clients.
    pub fn hub(&self) -> &Arc<ClientHub> {
        &self.hub
    }

    /// Dispatcher used for every client.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Shutdown coordinator.
    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Effective configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    let connections = state.hub.connection_count();
    if connections >= state.config.max_connections {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(
            connections,
            limit = state.config.max_connections,
            "connection limit reached, rejecting upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let client_id = ClientId::new();
    let deps = state.session_deps();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, client_id, deps))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.hub.connection_count(),
        state.dispatcher.session().strip_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
