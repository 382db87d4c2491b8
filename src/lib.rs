//! Ride Dispatch - backend de viajes
//!
//! Coordina el ciclo de vida de los viajes (REQUESTED -> ACCEPTED -> STARTED
//! -> COMPLETED, con cancelación de vuelta al pool) para las apps de pasajero
//! y conductor.

pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
