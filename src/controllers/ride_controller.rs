use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::dto::ride_dto::{CreateRideRequest, LocationRequest};
use crate::models::ride::{LocationSample, Ride, RidePayload, RideStatus};
use crate::services::ride_registry::RideRegistry;
use crate::services::transition_validator;
use crate::utils::errors::{validation_error, AppError, AppResult, RideError, RideResult};

/// Acciones del conductor sobre un viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideAction {
    Accept,
    Start,
    Complete,
    Cancel,
}

impl RideAction {
    /// Estado destino. La cancelación devuelve el viaje al pool (REQUESTED).
    pub fn target(&self) -> RideStatus {
        match self {
            RideAction::Accept => RideStatus::Accepted,
            RideAction::Start => RideStatus::Started,
            RideAction::Complete => RideStatus::Completed,
            RideAction::Cancel => RideStatus::Requested,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RideAction::Accept => "accept",
            RideAction::Start => "start",
            RideAction::Complete => "complete",
            RideAction::Cancel => "cancel",
        }
    }
}

/// Valida y aplica la acción sobre el borrador del viaje
pub fn apply_action(ride: &mut Ride, action: RideAction, driver_id: &str) -> RideResult<()> {
    let target = action.target();
    transition_validator::validate(ride.status, target, Some(&*ride), driver_id)?;

    match action {
        RideAction::Accept => {
            // Un viaje devuelto al pool conserva su conductor
            if ride.is_bound_to_other(driver_id) {
                return Err(RideError::ForbiddenActor);
            }
            ride.driver_id = Some(driver_id.to_string());
        }
        RideAction::Start => {
            ride.locations.get_or_insert_with(Vec::new);
        }
        RideAction::Complete | RideAction::Cancel => {}
    }

    ride.status = target;
    Ok(())
}

/// Añade la muestra al principio de la secuencia si el conductor es el
/// asignado y el viaje está en curso
pub fn apply_location(
    ride: &mut Ride,
    driver_id: &str,
    sample: LocationSample,
    retention: Option<usize>,
) -> RideResult<()> {
    if ride.driver_id.as_deref() != Some(driver_id) {
        return Err(RideError::ForbiddenActor);
    }
    if ride.status != RideStatus::Started {
        return Err(RideError::NotStarted(ride.status));
    }
    ride.push_location(sample, retention);
    Ok(())
}

pub struct RideController {
    registry: Arc<RideRegistry>,
    location_retention: Option<usize>,
}

impl RideController {
    pub fn new(registry: Arc<RideRegistry>, location_retention: Option<usize>) -> Self {
        Self {
            registry,
            location_retention,
        }
    }

    pub async fn create(&self, request: CreateRideRequest) -> AppResult<Ride> {
        request.validate()?;
        let (pickup, dropoff) = match (request.pickup, request.dropoff) {
            (Some(pickup), Some(dropoff)) => (pickup, dropoff),
            _ => return Err(validation_error("pickup and dropoff required").into()),
        };

        let payload = RidePayload {
            passenger_name: request.passenger_name,
            pickup: Some(pickup.into()),
            dropoff: Some(dropoff.into()),
            notes: request.notes,
        };

        Ok(self.registry.create(payload).await?)
    }

    pub async fn list(&self, status: Option<&str>) -> Vec<Ride> {
        self.registry.list(status).await
    }

    pub async fn get(&self, id: &str) -> AppResult<Ride> {
        self.registry
            .get(id)
            .await
            .ok_or(AppError::Ride(RideError::NotFound))
    }

    pub async fn dump(&self) -> Vec<Ride> {
        self.registry.dump_all().await
    }

    pub async fn transition(
        &self,
        id: &str,
        driver_id: &str,
        action: RideAction,
    ) -> AppResult<Ride> {
        let result = self
            .registry
            .mutate(id, |ride| apply_action(ride, action, driver_id))
            .await;

        match &result {
            Ok(ride) => {
                info!("🚗 {} {} por {} -> {}", action.as_str(), id, driver_id, ride.status)
            }
            Err(e) => {
                warn!("⚠️ {} {} por {} rechazado: {}", action.as_str(), id, driver_id, e)
            }
        }
        Ok(result?)
    }

    pub async fn append_location(
        &self,
        id: &str,
        driver_id: &str,
        request: LocationRequest,
    ) -> AppResult<Ride> {
        let sample = LocationSample {
            lat: request.lat,
            lng: request.lng,
            ts: request.ts.unwrap_or_else(Utc::now),
        };
        let retention = self.location_retention;

        let result = self
            .registry
            .mutate(id, |ride| apply_location(ride, driver_id, sample, retention))
            .await;

        match &result {
            Ok(ride) => {
                if let Some(last) = ride.latest_location() {
                    debug!("📍 {} en ({}, {}) a las {}", id, last.lat, last.lng, last.ts);
                }
            }
            Err(e) => warn!("⚠️ Ubicación para {} por {} rechazada: {}", id, driver_id, e),
        }
        Ok(result?)
    }
}
