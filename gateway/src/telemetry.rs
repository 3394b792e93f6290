//! Utilities for collecting and reporting telemetry data.

use axum::{
    extract::State,
    http::{header, Response, StatusCode},
    routing::get,
    serve, Router,
};
use prometheus_client::{encoding::text::encode, registry::Registry};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, Level};
use tracing_subscriber::layer::SubscriberExt;

/// Initialize telemetry with the given configuration.
///
/// Metrics registered in `registry` are served at `/metrics` on `metrics`, if provided.
pub fn init(level: Level, metrics: Option<SocketAddr>, registry: Registry) {
    // Create fmt layer for logging
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_line_number(true)
        .with_thread_ids(true)
        .with_file(true);

    // Create a filter layer to set the maximum level
    let filter = tracing_subscriber::EnvFilter::new(level.to_string());

    // Set the global subscriber
    let subscriber = tracing_subscriber::Registry::default()
        .with(filter)
        .with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    // Expose metrics over HTTP
    if let Some(addr) = metrics {
        let registry = Arc::new(registry);
        tokio::spawn(async move {
            let listener = TcpListener::bind(addr)
                .await
                .expect("Could not bind to metrics address");
            serve(listener, router(registry).into_make_service())
                .await
                .expect("Could not serve metrics");
        });
    }
}

/// Router serving the encoded `registry` at `/metrics`.
pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(|State(registry): State<Arc<Registry>>| async move {
                let mut buffer = String::new();
                let status = match encode(&mut buffer, &registry) {
                    Ok(()) => StatusCode::OK,
                    Err(err) => {
                        error!(?err, "failed to encode metrics");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                Response::builder()
                    .status(status)
                    .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                    .body(buffer)
                    .expect("failed to create response")
            }),
        )
        .with_state(registry)
}
