//! Middleware de CORS
//!
//! La app del pasajero y la del conductor se sirven desde otros orígenes.

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::environment::EnvironmentConfig;

/// CORS según la configuración: lista explícita si hay `CORS_ORIGINS`;
/// si no, cualquier origen en desarrollo y ninguno fuera de desarrollo.
pub fn cors_layer(config: &EnvironmentConfig) -> CorsLayer {
    if !config.cors_origins.is_empty() {
        return cors_layer_with_origins(&config.cors_origins);
    }
    if config.is_development() {
        return CorsLayer::very_permissive();
    }

    warn!(
        "⚠️ CORS_ORIGINS vacío en {}: peticiones cross-origin bloqueadas",
        config.environment
    );
    CorsLayer::new()
}

/// CORS con orígenes específicos
pub fn cors_layer_with_origins(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
