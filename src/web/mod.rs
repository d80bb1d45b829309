// Web server: Axum backend that proxies scans to the upstream providers.
//
// Browsers never see API keys: they POST a URL here and receive the
// normalized verdict. All routes serve JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, DEFAULT_ALLOWED_ORIGIN};
use crate::credentials::CredentialRotator;
use crate::scan::{ScanError, Scanner};

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub scanner: Arc<Scanner>,
    pub rotator: Arc<CredentialRotator>,
    pub config: Arc<Config>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(
    config: Config,
    scanner: Arc<Scanner>,
    rotator: Arc<CredentialRotator>,
    port: u16,
    bind: &str,
) -> Result<()> {
    let state = AppState {
        scanner,
        rotator,
        config: Arc::new(config),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("urlwarden listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let origin = match HeaderValue::from_str(&state.config.allowed_origin) {
        Ok(origin) => origin,
        Err(_) => {
            warn!(
                origin = %state.config.allowed_origin,
                "Invalid URLWARDEN_ALLOWED_ORIGIN, using default"
            );
            HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN)
        }
    };

    Router::new()
        .route("/", get(handlers::status::index))
        .route("/health", get(handlers::status::health))
        .route("/api/quota", get(handlers::status::quota))
        .route("/api/scan", post(handlers::scan::scan_url))
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::exact(origin))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(method: Method, uri: Uri) -> Response {
    api_error(
        StatusCode::NOT_FOUND,
        "Not Found",
        &format!("Cannot {method} {}", uri.path()),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        axum::Json(serde_json::json!({ "error": error, "message": message })),
    )
        .into_response()
}

/// Map a request-level scan failure to its HTTP response.
pub fn scan_error_response(e: &ScanError) -> Response {
    let status = match e {
        ScanError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        ScanError::NoProviders | ScanError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, e.kind(), &e.to_string())
}
