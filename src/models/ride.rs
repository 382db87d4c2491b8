//! Modelo de Ride
//!
//! Este módulo contiene la entidad `Ride`, su estado en el ciclo de vida y
//! las muestras de ubicación que se acumulan mientras el viaje está en curso.
//! El formato JSON (camelCase, estados en mayúsculas) es el mismo que se
//! guarda en el snapshot y el que se devuelve por la API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::serde_helpers::deser_timestamp;

/// Estado del viaje
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RideStatus {
    Requested,
    Accepted,
    Started,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub const ALL: [RideStatus; 5] = [
        RideStatus::Requested,
        RideStatus::Accepted,
        RideStatus::Started,
        RideStatus::Completed,
        RideStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "REQUESTED",
            RideStatus::Accepted => "ACCEPTED",
            RideStatus::Started => "STARTED",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
        }
    }

    /// Estados sin salida en la tabla de transiciones
    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parseo sin distinguir mayúsculas ("requested", "Requested", ...)
impl FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RideStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown ride status '{}'", s))
    }
}

/// Coordenadas geográficas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Datos enviados por el pasajero al crear el viaje. No se modifican nunca.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RidePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passenger_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Muestra de ubicación enviada por el conductor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    #[serde(deserialize_with = "deser_timestamp")]
    pub ts: DateTime<Utc>,
}

/// Ride principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub status: RideStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub payload: RidePayload,
    /// Más reciente primero. Ausente hasta que el viaje arranca.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<LocationSample>>,
    /// Se escribe en RFC 3339; se aceptan también milisegundos epoch
    #[serde(deserialize_with = "deser_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Ride {
    /// Nuevo viaje en estado REQUESTED, sin conductor ni ubicaciones
    pub fn new(payload: RidePayload) -> Self {
        Self::with_id(generate_ride_id(), payload)
    }

    pub fn with_id(id: String, payload: RidePayload) -> Self {
        Self {
            id,
            status: RideStatus::Requested,
            driver_id: None,
            payload,
            locations: None,
            created_at: Utc::now(),
        }
    }

    /// `true` si hay un conductor asignado y es distinto de `driver_id`
    pub fn is_bound_to_other(&self, driver_id: &str) -> bool {
        self.driver_id.as_deref().is_some_and(|bound| bound != driver_id)
    }

    /// Inserta la muestra al principio de la secuencia. Con `retention`
    /// se descartan las muestras más antiguas que excedan el límite.
    pub fn push_location(&mut self, sample: LocationSample, retention: Option<usize>) {
        let locations = self.locations.get_or_insert_with(Vec::new);
        locations.insert(0, sample);
        if let Some(max) = retention {
            locations.truncate(max.max(1));
        }
    }

    /// Última ubicación conocida
    pub fn latest_location(&self) -> Option<&LocationSample> {
        self.locations.as_ref().and_then(|l| l.first())
    }
}

pub fn generate_ride_id() -> String {
    format!("r_{}", Uuid::new_v4().simple())
}
