//! REST API and WebSocket server for the network monitor
//!
//! This module provides HTTP endpoints for controlling per-device monitors,
//! reading snapshots and thresholds, running ad hoc ping/traceroute and
//! listing filed tickets, plus WebSocket support for live events.
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Monitor handles** for everything device related
//! - **WebSocket** fed by the [`EventGateway`](crate::events::EventGateway)
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/devices` - List monitored devices
//! - `POST /api/v1/devices/{id}/start` - Begin polling
//! - `POST /api/v1/devices/{id}/stop` - Stop polling
//! - `GET /api/v1/devices/{id}/status` - Monitor status
//! - `GET /api/v1/devices/{id}/data` - Last snapshot
//! - `POST /api/v1/devices/{id}/poll` - Poll once now
//! - `POST /api/v1/devices/{id}/ping` - Ping from the device
//! - `POST /api/v1/devices/{id}/traceroute` - Traceroute from the device
//! - `GET|POST /api/v1/devices/{id}/thresholds` - Read or update thresholds
//! - `GET /api/v1/tickets` - Recently filed tickets
//! - `WS /api/v1/stream` - Real-time event streaming

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;
#[cfg(feature = "api")]
pub mod websocket;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{DevicesResponse, HealthResponse, TicketsResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tracing::info;

use crate::config::ApiSection;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,

    /// Enable CORS for dashboard
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: crate::util::get_bind_addr(),
            auth_token: crate::util::get_api_token(),
            enable_cors: true,
        }
    }
}

impl From<&ApiSection> for ApiConfig {
    fn from(section: &ApiSection) -> Self {
        Self {
            bind_addr: section.bind,
            auth_token: section.token.clone().or_else(crate::util::get_api_token),
            enable_cors: section.cors,
        }
    }
}

/// Build the application router with all routes and layers
#[cfg(feature = "api")]
pub fn router(state: ApiState, config: &ApiConfig) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/devices", get(routes::devices::list_devices))
        .route(
            "/api/v1/devices/:id/start",
            post(routes::devices::start_monitoring),
        )
        .route(
            "/api/v1/devices/:id/stop",
            post(routes::devices::stop_monitoring),
        )
        .route(
            "/api/v1/devices/:id/status",
            get(routes::devices::get_status),
        )
        .route(
            "/api/v1/devices/:id/data",
            get(routes::devices::get_latest_data),
        )
        .route("/api/v1/devices/:id/poll", post(routes::devices::poll_now))
        .route("/api/v1/devices/:id/ping", post(routes::devices::ping))
        .route(
            "/api/v1/devices/:id/traceroute",
            post(routes::devices::traceroute),
        )
        .route(
            "/api/v1/devices/:id/thresholds",
            get(routes::devices::get_thresholds).post(routes::devices::update_thresholds),
        )
        .route("/api/v1/tickets", get(routes::tickets::list_tickets))
        .route("/api/v1/stream", get(websocket::websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Add auth middleware if token provided
    if let Some(token) = config.auth_token.clone() {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, &config);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    // Spawn server in background
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
