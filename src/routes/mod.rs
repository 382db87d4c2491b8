pub mod auth_routes;
pub mod ride_routes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::cors::cors_layer;
use crate::state::AppState;

/// Router completo de la API
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(auth_routes::create_auth_router())
        .merge(ride_routes::create_ride_router(state.clone()))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
