// POST /api/scan: scan one URL across every enabled provider.
//
// Body: {"url": "<absolute http(s) URL>"}
// Returns 200 with the normalized verdict, even when some providers failed.
// Returns 400 invalid_url for a malformed URL or body, 503 when no provider
// is enabled.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::scan::{normalize, ScanError};
use crate::web::{scan_error_response, AppState};

pub async fn scan_url(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let url = match &body {
        Ok(Json(value)) => value.get("url").and_then(|u| u.as_str()),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected scan request body");
            None
        }
    };

    let Some(url) = url else {
        return scan_error_response(&ScanError::InvalidUrl(
            "request body must be a JSON object with a string \"url\" field".to_string(),
        ));
    };

    match state.scanner.aggregate(url).await {
        Ok(report) => Json(normalize(&report)).into_response(),
        Err(e) => scan_error_response(&e),
    }
}
