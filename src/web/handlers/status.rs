// Service metadata endpoints: index, health and quota.
//
// Health reports key presence per service without ever echoing a key.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use crate::service::ServiceId;
use crate::web::AppState;

/// GET /: short description of the API.
pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "urlwarden URL reputation API",
        "endpoints": ["/health", "/api/scan", "/api/quota"],
    }))
}

/// GET /health: liveness plus which services have a key configured.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let services: serde_json::Map<String, serde_json::Value> = ServiceId::ALL
        .into_iter()
        .map(|service| {
            let present = state.config.service(service).keys.primary.is_some();
            let label = if present { "Present" } else { "Missing" };
            (service.as_str().to_string(), serde_json::json!(label))
        })
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "enabled": state.scanner.services(),
        "services": services,
    }))
}

/// GET /api/quota: current credential slot state for every keyed service.
pub async fn quota(State(state): State<AppState>) -> impl IntoResponse {
    let slots: Vec<serde_json::Value> = state
        .rotator
        .snapshots()
        .into_iter()
        .map(|slot| {
            serde_json::json!({
                "service": slot.service,
                "activeTier": slot.active_tier,
                "usageCount": slot.usage_count,
                "monthlyLimit": slot.monthly_limit,
                "remainingQuota": slot.remaining_quota(),
                "hasBackup": slot.has_backup,
                "lastReset": format!(
                    "{:04}-{:02}",
                    slot.last_reset_month.year, slot.last_reset_month.month
                ),
            })
        })
        .collect();

    Json(serde_json::json!({ "slots": slots }))
}
