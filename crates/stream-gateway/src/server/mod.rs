//! Gateway server setup
//!
//! Provides the WebSocket server routes, binding, and graceful serving.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::StreamGateway;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use stream_common::{AppError, AppResult, ServerConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Live connection counts
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStats {
    pub connections: usize,
    pub sessions: usize,
}

/// Create the gateway router
pub fn create_router() -> Router<StreamGateway> {
    Router::new()
        .route("/", get(gateway_handler))
        .route("/stream", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn stats(State(gateway): State<StreamGateway>) -> Json<GatewayStats> {
    Json(GatewayStats {
        connections: gateway.registry().connection_count(),
        sessions: gateway.registry().session_count(),
    })
}

/// Build the complete application
pub fn create_app(gateway: StreamGateway) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Bind the listener described by `config`
pub async fn bind(config: &ServerConfig) -> AppResult<TcpListener> {
    let addr = config.address();
    tracing::info!("Starting Gateway server on {}", addr);

    TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::bind(addr, e))
}

/// Serve the gateway until it is closed
pub async fn serve(listener: TcpListener, gateway: StreamGateway) -> AppResult<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/", addr);
    }

    let app = create_app(gateway.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { gateway.closed().await })
        .await
        .map_err(|e| AppError::Server(e.to_string()))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
