//! Stream Gateway Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p stream-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use std::sync::Arc;
use stream_common::{
    try_init_tracing, try_init_tracing_with_config, AppError, AppResult, GatewayConfig, TracingConfig,
};
use stream_gateway::handlers::{EventRouter, LoggingChunkConsumer};
use stream_gateway::StreamGateway;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let result = match GatewayConfig::from_env() {
        Ok(config) => {
            if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
                eprintln!("Warning: Failed to initialize tracing: {e}");
            }
            run(config).await
        }
        Err(e) => {
            if let Err(e) = try_init_tracing() {
                eprintln!("Warning: Failed to initialize tracing: {e}");
            }
            Err(AppError::from(e))
        }
    };

    if let Err(e) = result {
        error!(error = %e, code = e.error_code(), "Gateway failed");
        std::process::exit(1);
    }
}

async fn run(config: GatewayConfig) -> AppResult<()> {
    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.server.port,
        heartbeat_ms = config.heartbeat.interval_ms,
        "Configuration loaded"
    );

    let listener = stream_gateway::bind(&config.server).await?;
    let gateway = StreamGateway::new(config);

    let router = EventRouter::new(gateway.dispatcher().clone(), Arc::new(LoggingChunkConsumer))
        .spawn(gateway.subscribe());
    let heartbeat = gateway.spawn_heartbeat();

    tokio::spawn(close_on_signal(gateway.clone()));

    stream_gateway::serve(listener, gateway).await?;

    heartbeat.await.map_err(AppError::internal)?;
    router.abort();

    info!("Gateway shut down");
    Ok(())
}

/// Close the gateway on Ctrl-C or SIGTERM
async fn close_on_signal(gateway: StreamGateway) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    gateway.close();
}
