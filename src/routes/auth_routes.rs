use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::dto::ride_dto::{LoginRequest, LoginResponse};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Rutas públicas: health y login
pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "now": chrono::Utc::now().timestamp_millis(),
    }))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let driver_id = request.driver_id.trim();
    let token = state.auth.issue_token(driver_id).map_err(AppError::Internal)?;

    info!("🔑 Token emitido para el conductor {}", driver_id);
    Ok(Json(LoginResponse { token }))
}
