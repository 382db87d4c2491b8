//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del ciclo de vida de los viajes.

pub mod ride;

pub use ride::*;
