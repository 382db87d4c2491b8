//! Middleware de autenticación
//!
//! Extrae el token Bearer, resuelve el conductor que actúa e inyecta
//! `AuthenticatedDriver` en las extensions de la request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;
use crate::utils::errors::AppError;

/// Conductor autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedDriver {
    pub driver_id: String,
}

/// Middleware de autenticación Bearer
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_str| auth_str.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let driver_id = state
        .actor_resolver()
        .resolve_actor(token)
        .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

    request.extensions_mut().insert(AuthenticatedDriver { driver_id });

    Ok(next.run(request).await)
}
