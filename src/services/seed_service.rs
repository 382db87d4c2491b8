//! Datos de ejemplo
//!
//! Si el snapshot cargado al arrancar está vacío se crean algunos viajes
//! REQUESTED para que la app de conductores tenga algo que aceptar.

use tracing::info;

use crate::models::ride::{Ride, RidePayload};
use crate::services::ride_registry::RideRegistry;
use crate::utils::errors::RideResult;

/// Crea `count` viajes de ejemplo y persiste una sola vez
pub async fn seed_sample_rides(registry: &RideRegistry, count: usize) -> RideResult<Vec<Ride>> {
    let mut created = Vec::with_capacity(count);
    for i in 0..count {
        let payload = RidePayload {
            passenger_name: Some(format!("Passenger {}", i + 1)),
            ..RidePayload::default()
        };
        created.push(registry.insert_new(payload).await);
    }

    if !created.is_empty() {
        registry.persist().await?;
        let ids: Vec<&str> = created.iter().map(|r| r.id.as_str()).collect();
        info!("🌱 Viajes de ejemplo creados: {:?}", ids);
    }
    Ok(created)
}

/// Siembra solo si el registro está vacío
pub async fn seed_if_empty(registry: &RideRegistry, count: usize) -> RideResult<usize> {
    if registry.count().await > 0 {
        return Ok(0);
    }
    info!("🌱 No hay viajes - sembrando {} viajes de ejemplo...", count);
    Ok(seed_sample_rides(registry, count).await?.len())
}
