use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use ride_dispatch::config::environment::EnvironmentConfig;
use ride_dispatch::repositories::JsonFileSnapshotStore;
use ride_dispatch::routes::create_app;
use ride_dispatch::services::{seed_service, AuthService, RideRegistry};
use ride_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("🚕 Ride Dispatch - Backend de viajes");
    info!("===================================");

    // Cargar snapshot
    let store = Arc::new(JsonFileSnapshotStore::new(config.rides_db_path.clone()));
    let registry = Arc::new(RideRegistry::new(store));
    let loaded = registry.load_from_store().await.map_err(|e| {
        error!("❌ Error cargando {}: {}", config.rides_db_path.display(), e);
        anyhow::anyhow!("Error de persistencia: {}", e)
    })?;
    info!("📂 {} viajes cargados desde {}", loaded, config.rides_db_path.display());

    seed_service::seed_if_empty(&registry, config.seed_sample_rides).await?;

    if config.location_retention.is_none() {
        info!("📍 Retención de ubicaciones: sin límite");
    }
    if config.location_fault_rate > 0.0 {
        info!("💥 Fallos simulados en /location: {:.0}%", config.location_fault_rate * 100.0);
    }

    let auth = Arc::new(AuthService::from_config(&config));
    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_app(AppState::new(config, registry, auth));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("   POST /login - Token de conductor");
    info!("   GET  /rides?status= - Listar viajes");
    info!("   POST /rides - Crear viaje");
    info!("   GET  /rides/:id - Obtener viaje");
    info!("   POST /rides/:id/accept|start|complete|cancel - Transiciones");
    info!("   POST /rides/:id/location - Añadir ubicación");
    info!("   GET  /__all_rides - Snapshot completo (debug)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
