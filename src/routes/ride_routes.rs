use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::ride_controller::RideAction;
use crate::dto::ride_dto::{CreateRideRequest, ListRidesQuery, LocationRequest, LocationResponse};
use crate::middleware::auth::{auth_middleware, AuthenticatedDriver};
use crate::models::ride::Ride;
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

/// Rutas de viajes. Todas requieren un conductor autenticado.
pub fn create_ride_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/rides", get(list_rides).post(create_ride))
        .route("/rides/:id", get(get_ride))
        .route("/rides/:id/accept", post(accept_ride))
        .route("/rides/:id/start", post(start_ride))
        .route("/rides/:id/complete", post(complete_ride))
        .route("/rides/:id/cancel", post(cancel_ride))
        .route("/rides/:id/location", post(append_location))
        .route("/__all_rides", get(all_rides))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

async fn list_rides(
    State(state): State<AppState>,
    Query(query): Query<ListRidesQuery>,
) -> Json<Vec<Ride>> {
    Json(state.ride_controller().list(query.status.as_deref()).await)
}

async fn create_ride(
    State(state): State<AppState>,
    payload: Result<Json<CreateRideRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Ride>)> {
    let Json(request) = payload?;
    let ride = state.ride_controller().create(request).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Ride>> {
    Ok(Json(state.ride_controller().get(&id).await?))
}

async fn transition(
    state: &AppState,
    id: &str,
    driver: &AuthenticatedDriver,
    action: RideAction,
) -> AppResult<Json<Ride>> {
    let ride = state
        .ride_controller()
        .transition(id, &driver.driver_id, action)
        .await?;
    Ok(Json(ride))
}

async fn accept_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(driver): Extension<AuthenticatedDriver>,
) -> AppResult<Json<Ride>> {
    transition(&state, &id, &driver, RideAction::Accept).await
}

async fn start_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(driver): Extension<AuthenticatedDriver>,
) -> AppResult<Json<Ride>> {
    transition(&state, &id, &driver, RideAction::Start).await
}

async fn complete_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(driver): Extension<AuthenticatedDriver>,
) -> AppResult<Json<Ride>> {
    transition(&state, &id, &driver, RideAction::Complete).await
}

async fn cancel_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(driver): Extension<AuthenticatedDriver>,
) -> AppResult<Json<Ride>> {
    transition(&state, &id, &driver, RideAction::Cancel).await
}

async fn append_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(driver): Extension<AuthenticatedDriver>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> AppResult<Json<LocationResponse>> {
    let Json(request) = payload?;

    // Fallo intermitente simulado (pruebas de resiliencia de la app)
    let fault_rate = state.config.location_fault_rate;
    if fault_rate > 0.0 && rand::random::<f64>() < fault_rate {
        tracing::warn!("💥 Fallo simulado en ubicación de {}", id);
        return Err(AppError::SimulatedFailure);
    }

    let ride = state
        .ride_controller()
        .append_location(&id, &driver.driver_id, request)
        .await?;
    Ok(Json(LocationResponse { ok: true, ride }))
}

// Debug: snapshot completo
async fn all_rides(State(state): State<AppState>) -> Json<Vec<Ride>> {
    Json(state.ride_controller().dump().await)
}
