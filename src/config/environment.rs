//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del servicio. Todas las variables
//! tienen un valor por defecto razonable para desarrollo; un valor mal
//! formado es un error de arranque.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::utils::validation::validate_probability;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub rides_db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub seed_sample_rides: usize,
    /// Máximo de muestras de ubicación por viaje; `None` = sin límite
    pub location_retention: Option<usize>,
    /// Probabilidad de fallo simulado en el endpoint de ubicación
    pub location_fault_rate: f64,
    pub log_level: tracing::Level,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            rides_db_path: PathBuf::from("db.json"),
            jwt_secret: "dev-ride-dispatch-secret-change-in-production".to_string(),
            jwt_expiration: 86_400, // 24 horas
            cors_origins: Vec::new(),
            seed_sample_rides: 3,
            location_retention: None,
            location_fault_rate: 0.0,
            log_level: tracing::Level::DEBUG,
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración de las variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let location_fault_rate: f64 =
            parse_var("LOCATION_FAULT_RATE")?.unwrap_or(defaults.location_fault_rate);
        validate_probability(location_fault_rate)
            .map_err(|_| anyhow!("LOCATION_FAULT_RATE must be between 0 and 1"))?;

        let location_retention: Option<usize> = parse_var("LOCATION_RETENTION")?;
        if location_retention == Some(0) {
            return Err(anyhow!("LOCATION_RETENTION must be greater than 0"));
        }

        Ok(Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            rides_db_path: env::var("RIDES_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rides_db_path),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parse_var("JWT_EXPIRATION")?.unwrap_or(defaults.jwt_expiration),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or(defaults.cors_origins),
            seed_sample_rides: parse_var("SEED_SAMPLE_RIDES")?
                .unwrap_or(defaults.seed_sample_rides),
            location_retention,
            location_fault_rate,
            log_level: parse_var("LOG_LEVEL")?.unwrap_or(defaults.log_level),
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", name, raw)),
        _ => Ok(None),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
