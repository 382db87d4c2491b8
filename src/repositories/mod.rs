//! Repositorios
//!
//! Acceso a la persistencia del snapshot de viajes.

pub mod snapshot_repository;

pub use snapshot_repository::*;
