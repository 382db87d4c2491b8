//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum. El registro y el servicio de identidad se
//! inyectan aquí; no hay estado global a nivel de módulo.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::controllers::ride_controller::RideController;
use crate::services::{ActorResolver, AuthService, RideRegistry};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub registry: Arc<RideRegistry>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        registry: Arc<RideRegistry>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self { config, registry, auth }
    }

    pub fn ride_controller(&self) -> RideController {
        RideController::new(self.registry.clone(), self.config.location_retention)
    }

    pub fn actor_resolver(&self) -> &dyn ActorResolver {
        self.auth.as_ref()
    }
}
