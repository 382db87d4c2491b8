//! Registro de viajes
//!
//! Colección en memoria de viajes indexada por id, con una única primitiva de
//! mutación (`mutate`) que garantiza como mucho una mutación en curso por
//! viaje. Cada viaje tiene su propio candado de escritura: mutaciones sobre
//! viajes distintos avanzan en paralelo, las del mismo viaje se serializan.
//!
//! Los lectores (`get`, `list`, `dump_all`) no esperan al candado de
//! escritura: ven el estado anterior o el posterior a una mutación en curso,
//! nunca uno a medio aplicar, porque el closure trabaja sobre un borrador y el
//! commit es un reemplazo completo.
//!
//! Después de cada mutación exitosa se entrega el snapshot completo al
//! `SnapshotStore`, ya fuera del candado del viaje. Un fallo al persistir se
//! registra y se devuelve, pero no deshace el cambio en memoria.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::models::ride::{Ride, RidePayload};
use crate::repositories::SnapshotStore;
use crate::utils::errors::{RideError, RideResult};

struct RideSlot {
    /// Candado de escritura: una mutación en curso por viaje
    gate: Mutex<()>,
    /// Último estado confirmado
    current: RwLock<Ride>,
}

impl RideSlot {
    fn new(ride: Ride) -> Arc<Self> {
        Arc::new(Self {
            gate: Mutex::new(()),
            current: RwLock::new(ride),
        })
    }
}

pub struct RideRegistry {
    rides: RwLock<HashMap<String, Arc<RideSlot>>>,
    store: Arc<dyn SnapshotStore>,
    /// Serializa las escrituras del snapshot
    persist_gate: Mutex<()>,
}

impl RideRegistry {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            rides: RwLock::new(HashMap::new()),
            store,
            persist_gate: Mutex::new(()),
        }
    }

    /// Carga el snapshot del colaborador de persistencia (arranque)
    pub async fn load_from_store(&self) -> RideResult<usize> {
        let rides = self.store.load_snapshot().await?;
        let count = rides.len();
        self.load_all(rides).await;
        Ok(count)
    }

    /// Reemplazo completo del contenido del registro. Una mutación en curso
    /// sobre un viaje reemplazado no llega a confirmarse y devuelve `NotFound`.
    pub async fn load_all(&self, snapshot: Vec<Ride>) {
        let mut map = HashMap::with_capacity(snapshot.len());
        for ride in snapshot {
            if map.contains_key(&ride.id) {
                warn!("⚠️ Id duplicado en el snapshot: {}, se conserva el último", ride.id);
            }
            map.insert(ride.id.clone(), RideSlot::new(ride));
        }
        info!("📥 Registro cargado con {} viajes", map.len());
        *self.rides.write().await = map;
    }

    /// Snapshot completo, ordenado por fecha de creación
    pub async fn dump_all(&self) -> Vec<Ride> {
        let slots: Vec<Arc<RideSlot>> = self.rides.read().await.values().cloned().collect();
        let mut rides = Vec::with_capacity(slots.len());
        for slot in slots {
            rides.push(slot.current.read().await.clone());
        }
        rides.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        rides
    }

    pub async fn count(&self) -> usize {
        self.rides.read().await.len()
    }

    pub async fn get(&self, id: &str) -> Option<Ride> {
        let slot = self.slot(id).await?;
        let ride = slot.current.read().await.clone();
        Some(ride)
    }

    /// Lista de viajes, con filtro de estado opcional sin distinguir mayúsculas
    pub async fn list(&self, status: Option<&str>) -> Vec<Ride> {
        let rides = self.dump_all().await;
        match status.map(str::trim).filter(|s| !s.is_empty()) {
            None => rides,
            Some(filter) => rides
                .into_iter()
                .filter(|ride| ride.status.as_str().eq_ignore_ascii_case(filter))
                .collect(),
        }
    }

    /// Crea un viaje nuevo en estado REQUESTED y persiste el snapshot
    pub async fn create(&self, payload: RidePayload) -> RideResult<Ride> {
        let ride = self.insert_new(payload).await;
        info!("🆕 Viaje creado: {}", ride.id);
        self.persist().await?;
        Ok(ride)
    }

    /// Inserta un viaje nuevo sin persistir (el llamador persiste después)
    pub async fn insert_new(&self, payload: RidePayload) -> Ride {
        let mut map = self.rides.write().await;
        let mut ride = Ride::new(payload);
        while map.contains_key(&ride.id) {
            ride.id = crate::models::ride::generate_ride_id();
        }
        map.insert(ride.id.clone(), RideSlot::new(ride.clone()));
        ride
    }

    /// Primitiva de mutación atómica.
    ///
    /// `mutation` recibe un borrador del viaje; si devuelve `Err` el viaje
    /// queda exactamente como estaba. Si el id no existe se devuelve
    /// `NotFound` sin invocar `mutation`; también si el registro se recargó
    /// mientras `mutation` se ejecutaba.
    pub async fn mutate<F>(&self, id: &str, mutation: F) -> RideResult<Ride>
    where
        F: FnOnce(&mut Ride) -> RideResult<()>,
    {
        let slot = self.slot(id).await.ok_or(RideError::NotFound)?;

        let updated = {
            let _gate = slot.gate.lock().await;
            let before = slot.current.read().await.clone();
            let mut draft = before.clone();

            if let Err(e) = mutation(&mut draft) {
                debug!("↩️ Mutación rechazada para {}: {}", id, e);
                return Err(e);
            }
            check_invariants(&before, &draft)?;

            // Con el mapa bloqueado en lectura, `load_all` no puede reemplazar
            // el slot entre la comprobación y el commit
            let rides = self.rides.read().await;
            if !rides.get(id).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                warn!("⚠️ Viaje {} reemplazado durante la mutación, cambio descartado", id);
                return Err(RideError::NotFound);
            }
            *slot.current.write().await = draft.clone();
            draft
        };

        info!(
            "✅ Viaje {} actualizado: {} (driver: {})",
            updated.id,
            updated.status,
            updated.driver_id.as_deref().unwrap_or("-")
        );

        self.persist().await?;
        Ok(updated)
    }

    /// Entrega el snapshot completo al colaborador de persistencia
    pub async fn persist(&self) -> RideResult<()> {
        let _gate = self.persist_gate.lock().await;
        let snapshot = self.dump_all().await;
        self.store.save_snapshot(&snapshot).await.map_err(|e| {
            error!("❌ No se pudo persistir el snapshot ({} viajes): {}", snapshot.len(), e);
            e
        })
    }

    async fn slot(&self, id: &str) -> Option<Arc<RideSlot>> {
        self.rides.read().await.get(id).cloned()
    }
}

/// Campos que ningún closure puede alterar
fn check_invariants(before: &Ride, after: &Ride) -> RideResult<()> {
    if after.id != before.id
        || after.created_at != before.created_at
        || after.payload != before.payload
    {
        return Err(RideError::Validation("id, payload and createdAt are immutable".to_string()));
    }
    if let Some(bound) = before.driver_id.as_deref() {
        if after.driver_id.as_deref() != Some(bound) {
            return Err(RideError::ForbiddenActor);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::{Coordinates, RideStatus};
    use crate::repositories::InMemorySnapshotStore;
    use crate::services::transition_validator;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn registry() -> (Arc<RideRegistry>, Arc<InMemorySnapshotStore>) {
        let store = Arc::new(InMemorySnapshotStore::new());
        (Arc::new(RideRegistry::new(store.clone())), store)
    }

    fn payload() -> RidePayload {
        RidePayload {
            passenger_name: Some("Alice".into()),
            pickup: Some(Coordinates { lat: 12.3, lng: 45.6 }),
            dropoff: Some(Coordinates { lat: 98.7, lng: 65.4 }),
            notes: None,
        }
    }

    fn accept(driver: &str) -> impl FnOnce(&mut Ride) -> RideResult<()> + Send + 'static {
        let driver = driver.to_string();
        move |ride: &mut Ride| {
            let from = ride.status;
            transition_validator::validate(from, RideStatus::Accepted, Some(&*ride), &driver)?;
            ride.status = RideStatus::Accepted;
            ride.driver_id = Some(driver);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_persists_and_get() {
        let (registry, store) = registry();
        let ride = registry.create(payload()).await.unwrap();

        assert_eq!(ride.status, RideStatus::Requested);
        assert!(ride.driver_id.is_none());
        assert_eq!(registry.get(&ride.id).await, Some(ride.clone()));
        assert_eq!(store.saved().await, vec![ride]);
    }

    #[tokio::test]
    async fn test_mutate_unknown_id_never_calls_closure() {
        let (registry, _) = registry();
        let called = AtomicBool::new(false);
        let result = registry
            .mutate("missing", |_| {
                called.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(RideError::NotFound));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_rejected_mutation_leaves_ride_untouched() {
        let (registry, store) = registry();
        let ride = registry.create(payload()).await.unwrap();
        let saves = store.save_count().await;

        let result = registry
            .mutate(&ride.id, |draft| {
                draft.status = RideStatus::Started;
                draft.driver_id = Some("A".into());
                Err(RideError::ForbiddenActor)
            })
            .await;

        assert_eq!(result, Err(RideError::ForbiddenActor));
        let after = registry.get(&ride.id).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&after).unwrap(),
            serde_json::to_vec(&ride).unwrap()
        );
        assert_eq!(store.save_count().await, saves);
    }

    #[tokio::test]
    async fn test_bound_driver_cannot_be_reassigned() {
        let (registry, _) = registry();
        let ride = registry.create(payload()).await.unwrap();
        registry.mutate(&ride.id, accept("A")).await.unwrap();

        let result = registry
            .mutate(&ride.id, |draft| {
                draft.driver_id = Some("B".into());
                Ok(())
            })
            .await;
        assert_eq!(result, Err(RideError::ForbiddenActor));
        assert_eq!(registry.get(&ride.id).await.unwrap().driver_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_payload_is_immutable() {
        let (registry, _) = registry();
        let ride = registry.create(payload()).await.unwrap();
        let result = registry
            .mutate(&ride.id, |draft| {
                draft.payload.notes = Some("changed".into());
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(RideError::Validation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts_single_winner() {
        let (registry, _) = registry();
        let ride = registry.create(payload()).await.unwrap();

        let attempts = (0..16).map(|i| {
            let registry = registry.clone();
            let id = ride.id.clone();
            let driver = format!("driver-{}", i);
            tokio::spawn(async move {
                let result = registry.mutate(&id, accept(&driver)).await;
                (driver, result)
            })
        });
        let results = futures::future::join_all(attempts).await;

        let mut winners = Vec::new();
        for joined in results {
            let (driver, result) = joined.unwrap();
            match result {
                Ok(_) => winners.push(driver),
                Err(e) => assert!(
                    matches!(e, RideError::ForbiddenActor | RideError::IllegalTransition { .. }),
                    "unexpected error {:?}",
                    e
                ),
            }
        }

        assert_eq!(winners.len(), 1);
        let stored = registry.get(&ride.id).await.unwrap();
        assert_eq!(stored.status, RideStatus::Accepted);
        assert_eq!(stored.driver_id.as_deref(), Some(winners[0].as_str()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_distinct_rides_do_not_block_each_other() {
        let (registry, _) = registry();
        let a = registry.create(payload()).await.unwrap();
        let b = registry.create(payload()).await.unwrap();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let blocked = {
            let registry = registry.clone();
            let id = a.id.clone();
            tokio::spawn(async move {
                registry
                    .mutate(&id, move |draft| {
                        entered_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        draft.status = RideStatus::Accepted;
                        draft.driver_id = Some("A".into());
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap()).await.unwrap();

        // Otro viaje avanza mientras A está a mitad de mutación
        let other =
            tokio::time::timeout(Duration::from_secs(2), registry.mutate(&b.id, accept("B"))).await;
        assert!(other.expect("mutation on another ride was blocked").is_ok());

        // Los lectores ven el estado anterior de A
        let seen = tokio::time::timeout(Duration::from_secs(2), registry.get(&a.id)).await.unwrap();
        assert_eq!(seen.unwrap().status, RideStatus::Requested);

        release_tx.send(()).unwrap();
        assert!(blocked.await.unwrap().is_ok());
        assert_eq!(registry.get(&a.id).await.unwrap().status, RideStatus::Accepted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_same_ride_mutations_are_serialized() {
        let (registry, _) = registry();
        let ride = registry.create(payload()).await.unwrap();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let first = {
            let registry = registry.clone();
            let id = ride.id.clone();
            tokio::spawn(async move {
                registry
                    .mutate(&id, move |draft| {
                        entered_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        draft.status = RideStatus::Accepted;
                        draft.driver_id = Some("A".into());
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap()).await.unwrap();

        let second = {
            let registry = registry.clone();
            let id = ride.id.clone();
            tokio::spawn(async move { registry.mutate(&id, accept("B")).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!second.is_finished());

        release_tx.send(()).unwrap();
        assert!(first.await.unwrap().is_ok());
        // B observa el resultado de A, no un estado intermedio
        assert_eq!(second.await.unwrap(), Err(RideError::ForbiddenActor));
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_memory_state() {
        let (registry, store) = registry();
        let ride = registry.create(payload()).await.unwrap();
        store.set_fail_saves(true);

        let result = registry.mutate(&ride.id, accept("A")).await;
        assert!(matches!(result, Err(RideError::Persistence(_))));

        let stored = registry.get(&ride.id).await.unwrap();
        assert_eq!(stored.status, RideStatus::Accepted);
        assert_eq!(store.saved().await[0].status, RideStatus::Requested);
    }

    #[tokio::test]
    async fn test_list_filter_is_case_insensitive() {
        let (registry, _) = registry();
        let first = registry.create(payload()).await.unwrap();
        registry.create(payload()).await.unwrap();
        registry.mutate(&first.id, accept("A")).await.unwrap();

        assert_eq!(registry.list(None).await.len(), 2);
        assert_eq!(registry.list(Some("requested")).await.len(), 1);
        let accepted = registry.list(Some("Accepted")).await;
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, first.id);
        assert!(registry.list(Some("unknown")).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_all_replaces_contents() {
        let (registry, _) = registry();
        registry.create(payload()).await.unwrap();

        let seeded = Ride::with_id("r_loaded".into(), RidePayload::default());
        registry.load_all(vec![seeded.clone()]).await;

        assert_eq!(registry.count().await, 1);
        assert_eq!(registry.dump_all().await, vec![seeded]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reload_during_mutation_discards_the_change() {
        let (registry, _) = registry();
        let ride = registry.create(payload()).await.unwrap();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel::<()>();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let pending = {
            let registry = registry.clone();
            let id = ride.id.clone();
            tokio::spawn(async move {
                registry
                    .mutate(&id, move |draft| {
                        entered_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        draft.status = RideStatus::Accepted;
                        draft.driver_id = Some("A".into());
                        Ok(())
                    })
                    .await
            })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv().unwrap()).await.unwrap();

        // La recarga no espera a la mutación en curso
        tokio::time::timeout(Duration::from_secs(2), registry.load_all(vec![ride.clone()]))
            .await
            .expect("reload blocked by an in-flight mutation");

        release_tx.send(()).unwrap();
        assert_eq!(pending.await.unwrap(), Err(RideError::NotFound));

        let stored = registry.get(&ride.id).await.unwrap();
        assert_eq!(stored.status, RideStatus::Requested);
        assert!(stored.driver_id.is_none());

        // El viaje recargado sigue aceptando mutaciones
        registry.mutate(&ride.id, accept("B")).await.unwrap();
        assert_eq!(registry.get(&ride.id).await.unwrap().driver_id.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_load_from_store() {
        let ride = Ride::with_id("r_1".into(), RidePayload::default());
        let store = Arc::new(InMemorySnapshotStore::with_rides(vec![ride.clone()]));
        let registry = RideRegistry::new(store);

        assert_eq!(registry.load_from_store().await.unwrap(), 1);
        assert_eq!(registry.get("r_1").await, Some(ride));
    }
}
