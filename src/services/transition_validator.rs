//! Validador de transiciones
//!
//! Función pura consultada por cada mutación de estado: decide si el cambio
//! `from -> to` es legal para el viaje y el conductor que actúa.
//!
//! Tabla canónica (la cancelación devuelve el viaje al pool):
//!
//! ```text
//! REQUESTED -> ACCEPTED
//! ACCEPTED  -> STARTED, REQUESTED
//! STARTED   -> COMPLETED
//! COMPLETED -> (ninguna)
//! CANCELLED -> (ninguna)
//! ```

use crate::models::ride::{Ride, RideStatus};
use crate::utils::errors::{RideError, RideResult};

/// Destinos permitidos desde cada estado
pub fn allowed_targets(from: RideStatus) -> &'static [RideStatus] {
    match from {
        RideStatus::Requested => &[RideStatus::Accepted],
        RideStatus::Accepted => &[RideStatus::Started, RideStatus::Requested],
        RideStatus::Started => &[RideStatus::Completed],
        RideStatus::Completed | RideStatus::Cancelled => &[],
    }
}

pub fn is_allowed(from: RideStatus, to: RideStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Valida la transición. El orden de las reglas importa: la identidad solo
/// se comprueba en transiciones que presuponen un conductor asignado.
pub fn validate(
    from: RideStatus,
    to: RideStatus,
    ride: Option<&Ride>,
    acting_driver: &str,
) -> RideResult<()> {
    let ride = ride.ok_or(RideError::NotFound)?;

    // Idempotente, salvo que otro conductor intente "reconfirmar"
    if from == to {
        if ride.is_bound_to_other(acting_driver) {
            return Err(RideError::ForbiddenActor);
        }
        return Ok(());
    }

    if !is_allowed(from, to) {
        return Err(RideError::IllegalTransition { from, to });
    }

    let requires_bound_driver = matches!(to, RideStatus::Started | RideStatus::Completed)
        || (from == RideStatus::Accepted && to == RideStatus::Requested);

    if requires_bound_driver && ride.is_bound_to_other(acting_driver) {
        return Err(RideError::ForbiddenActor);
    }

    Ok(())
}
