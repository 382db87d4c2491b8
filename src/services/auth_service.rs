//! Servicio de identidad de conductores
//!
//! Emite tokens JWT para un `driverId` y resuelve la identidad que actúa
//! a partir de la credencial de cada request. El núcleo solo consume la
//! identidad resuelta a través de `ActorResolver`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EnvironmentConfig;

/// Resolución de identidad: credencial opaca -> driverId
pub trait ActorResolver: Send + Sync {
    fn resolve_actor(&self, credential: &str) -> Option<String>;
}

/// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct DriverClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct AuthService {
    algorithm: Algorithm,
    token_duration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(secret: &str, token_duration: Duration) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            token_duration,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(&config.jwt_secret, Duration::seconds(config.jwt_expiration as i64))
    }

    /// Genera un token para el conductor
    pub fn issue_token(&self, driver_id: &str) -> Result<String, String> {
        let now = Utc::now();
        let claims = DriverClaims {
            sub: driver_id.to_string(),
            exp: (now + self.token_duration).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| format!("Error generating token: {}", e))
    }

    /// Valida y decodifica un token
    pub fn validate_token(&self, token: &str) -> Result<DriverClaims, String> {
        let validation = Validation::new(self.algorithm);

        decode::<DriverClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| format!("Invalid token: {}", e))
    }
}

impl ActorResolver for AuthService {
    fn resolve_actor(&self, credential: &str) -> Option<String> {
        match self.validate_token(credential) {
            Ok(claims) if !claims.sub.trim().is_empty() => Some(claims.sub),
            Ok(_) => None,
            Err(e) => {
                debug!("🔒 Credencial rechazada: {}", e);
                None
            }
        }
    }
}
