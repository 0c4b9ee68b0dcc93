//! Shared HTTP plumbing: tracing setup, CORS, request logging, listeners.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    Router,
};
use leadrelay_core::config::CorsConfig;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Any origin when the allow-list is empty; otherwise exactly the listed origins.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("[http] ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        "[http] {} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Attach request logging and CORS to a service router.
pub fn finish(app: Router, cors: &CorsConfig) -> Router {
    app.layer(middleware::from_fn(log_requests))
        .layer(cors_layer(cors))
}

pub async fn health() -> &'static str {
    "OK"
}

/// Numeric status from a downstream service, 500 when it is not a valid code.
pub fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn serve(name: &'static str, listener: TcpListener, app: Router) -> std::io::Result<()> {
    tracing::info!("[{}] listening on {}", name, listener.local_addr()?);
    axum::serve(listener, app).await
}
