//! SES receiver web server.
//!
//! Receives SNS deliveries for SES bounce and complaint notifications,
//! confirms topic subscriptions, and forwards suppression decisions to
//! RabbitMQ (or the log when no broker is configured).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sesreceiver::{
    router, AppState, Config, Dispatcher, Publisher, ReqwestConfirmationClient, SuppressionSink,
    TracingSuppressionSink,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    let config = Config::from_env();
    info!(
        port = config.port,
        confirm_timeout_ms = config.confirm_timeout_ms,
        max_unwrap_depth = config.max_unwrap_depth,
        rabbitmq_configured = config.cloudamqp_url.is_some(),
        suppression_queue = %config.suppression_queue,
        callback_token_configured = config.callback_token.is_some(),
        allowed_transports = ?config.allowed_transports,
        "config_loaded"
    );

    let client = ReqwestConfirmationClient::new(config.confirm_timeout())?;

    let publisher = config
        .cloudamqp_url
        .clone()
        .map(|url| Publisher::new(url, config.suppression_queue.clone()));

    let sink: Arc<dyn SuppressionSink> = match &publisher {
        Some(publisher) => {
            info!(queue = publisher.queue(), "rabbitmq_publisher_created");
            Arc::new(publisher.clone())
        }
        None => {
            info!("suppression_sink_logging_only");
            Arc::new(TracingSuppressionSink)
        }
    };

    let dispatcher = Dispatcher::new(Arc::new(client), sink)
        .with_max_unwrap_depth(config.max_unwrap_depth);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, dispatcher));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(publisher) = publisher {
        publisher.close().await;
    }

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
