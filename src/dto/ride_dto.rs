use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ride::{Coordinates, Ride};
use crate::utils::serde_helpers::{deser_identifier, deser_timestamp_opt};
use crate::utils::validation::validate_not_empty;

// Coordenadas recibidas en la request (solo se exige que sean numéricas)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CoordinatesDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<CoordinatesDto> for Coordinates {
    fn from(dto: CoordinatesDto) -> Self {
        Coordinates { lat: dto.lat, lng: dto.lng }
    }
}

// Request para crear un viaje
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    #[validate(length(max = 120))]
    pub passenger_name: Option<String>,
    pub pickup: Option<CoordinatesDto>,
    pub dropoff: Option<CoordinatesDto>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

// Muestra de ubicación enviada por el conductor
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, deserialize_with = "deser_timestamp_opt")]
    pub ts: Option<DateTime<Utc>>,
}

// Response de ubicación
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub ok: bool,
    pub ride: Ride,
}

// Filtro del listado (?status=requested)
#[derive(Debug, Default, Deserialize)]
pub struct ListRidesQuery {
    pub status: Option<String>,
}

// Login de conductor
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "deser_identifier")]
    #[validate(custom = "validate_not_empty")]
    pub driver_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_request_accepts_epoch_millis() {
        let request: LocationRequest =
            serde_json::from_str(r#"{"lat":1,"lng":2,"ts":1700000000000}"#).unwrap();
        assert_eq!(request.ts.unwrap().timestamp_millis(), 1_700_000_000_000);

        let request: LocationRequest = serde_json::from_str(r#"{"lat":1,"lng":2}"#).unwrap();
        assert!(request.ts.is_none());
    }

    #[test]
    fn test_login_accepts_numeric_driver_id() {
        let request: LoginRequest = serde_json::from_str(r#"{"driverId":7}"#).unwrap();
        assert_eq!(request.driver_id, "7");
        assert!(request.validate().is_ok());

        let request: LoginRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(request.validate().is_err());
    }
}
