//! Repositorio de snapshots
//!
//! Colaborador de persistencia del registro de viajes. Siempre se trabaja con
//! el snapshot completo: se carga una vez al arrancar y se sobrescribe entero
//! después de cada mutación exitosa.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::ride::Ride;
use crate::utils::errors::{RideError, RideResult};

/// Contrato de persistencia consumido por el registro
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load_snapshot(&self) -> RideResult<Vec<Ride>>;
    async fn save_snapshot(&self, rides: &[Ride]) -> RideResult<()>;
}

/// Documento persistido: `{ "rides": [...] }`
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    rides: Vec<Ride>,
}

/// Snapshot en un documento JSON en disco
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load_snapshot(&self) -> RideResult<Vec<Ride>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📂 Snapshot {} no existe, se empieza vacío", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(RideError::Persistence(format!("Error leyendo snapshot: {}", e))),
        };

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }

        let document: SnapshotDocument = serde_json::from_slice(&bytes)
            .map_err(|e| RideError::Persistence(format!("Snapshot inválido: {}", e)))?;

        info!("📂 Snapshot cargado: {} viajes", document.rides.len());
        Ok(document.rides)
    }

    async fn save_snapshot(&self, rides: &[Ride]) -> RideResult<()> {
        let document = serde_json::to_vec_pretty(&serde_json::json!({ "rides": rides }))
            .map_err(|e| RideError::Persistence(format!("Error serializando snapshot: {}", e)))?;

        // Reemplazo completo: archivo temporal + rename
        let temp = self.temp_path();
        tokio::fs::write(&temp, &document)
            .await
            .map_err(|e| RideError::Persistence(format!("Error escribiendo snapshot: {}", e)))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RideError::Persistence(format!("Error reemplazando snapshot: {}", e)))?;

        debug!("💾 Snapshot guardado: {} viajes", rides.len());
        Ok(())
    }
}

/// Snapshot en memoria, para tests
#[derive(Default)]
pub struct InMemorySnapshotStore {
    rides: RwLock<Vec<Ride>>,
    saves: RwLock<usize>,
    fail_saves: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rides(rides: Vec<Ride>) -> Self {
        Self {
            rides: RwLock::new(rides),
            ..Self::default()
        }
    }

    /// Hace fallar los siguientes `save_snapshot`
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn saved(&self) -> Vec<Ride> {
        self.rides.read().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load_snapshot(&self) -> RideResult<Vec<Ride>> {
        Ok(self.rides.read().await.clone())
    }

    async fn save_snapshot(&self, rides: &[Ride]) -> RideResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RideError::Persistence("simulated write failure".to_string()));
        }
        *self.rides.write().await = rides.to_vec();
        *self.saves.write().await += 1;
        Ok(())
    }
}
