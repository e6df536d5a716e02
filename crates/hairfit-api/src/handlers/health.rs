//! Health check.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.provider_ids.as_slice(),
        "demoFallback": state.config.demo_fallback,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
