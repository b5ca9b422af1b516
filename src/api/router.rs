//! API router configuration.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use super::handlers::{dispatch, AppState, DispatchConfig};
use crate::engine::PingEngine;
use crate::session::SessionRegistry;

/// Value of `Access-Control-Allow-Methods` on every response.
pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Value of `Access-Control-Allow-Headers` on every response.
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Create the router with default state.
pub fn create_router() -> Router {
    create_router_with_state(AppState::new())
}

/// Create the router with custom state.
///
/// All classification happens in [`dispatch`], so the router itself is a
/// single fallback. CORS headers are stamped on every response, including
/// streams and errors.
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(CORS_ALLOW_METHODS),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(CORS_ALLOW_HEADERS),
                )),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Close open sessions and drain on Ctrl-C / SIGTERM.
    pub graceful_shutdown: bool,
    /// Routing and transport settings.
    pub dispatch: DispatchConfig,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
            dispatch: DispatchConfig::default(),
        }
    }
}

/// Start the server with the built-in [`PingEngine`].
pub async fn serve(config: ServerConfig) -> crate::Result<()> {
    let state = AppState::with_config(Arc::new(PingEngine::new()), config.dispatch.clone());
    serve_with_state(config, state).await
}

/// Start the server with custom state.
///
/// Routing settings come from `state`; `config.dispatch` is not consulted.
pub async fn serve_with_state(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let registry = Arc::clone(&state.registry);
    let router = create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("mcp-sse-bridge listening on {}", addr);

    let server = axum::serve(listener, router);
    if config.graceful_shutdown {
        server
            .with_graceful_shutdown(shutdown_signal(registry))
            .await?;
    } else {
        server.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, after closing every open session.
///
/// Open SSE responses never finish on their own, so they are ended here to
/// let the graceful drain complete.
async fn shutdown_signal(registry: Arc<SessionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let closed = registry.close_all();
    tracing::info!(sessions = closed, "Received shutdown signal, closed open sessions");
}
