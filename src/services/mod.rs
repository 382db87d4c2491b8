//! Services module
//!
//! Este módulo contiene la lógica de negocio: el validador de transiciones,
//! el registro de viajes con su primitiva de mutación atómica, la identidad
//! de los conductores y la siembra de datos de ejemplo.

pub mod auth_service;
pub mod ride_registry;
pub mod seed_service;
pub mod transition_validator;

pub use auth_service::{ActorResolver, AuthService};
pub use ride_registry::RideRegistry;
