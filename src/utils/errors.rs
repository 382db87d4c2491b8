//! Sistema de manejo de errores
//!
//! Este módulo define la taxonomía de errores del ciclo de vida de los viajes
//! (`RideError`) y su conversión a respuestas HTTP (`AppError`).

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ride::RideStatus;

/// Errores del núcleo: registro de viajes y validador de transiciones
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RideError {
    #[error("Ride not found")]
    NotFound,

    #[error("Invalid transition {from} -> {to}")]
    IllegalTransition { from: RideStatus, to: RideStatus },

    #[error("Ride not started (status {0})")]
    NotStarted(RideStatus),

    #[error("Action permitted only by assigned driver")]
    ForbiddenActor,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl RideError {
    /// Código estable expuesto a los clientes
    pub fn code(&self) -> &'static str {
        match self {
            RideError::NotFound => "NOT_FOUND",
            RideError::IllegalTransition { .. } | RideError::NotStarted(_) => "ILLEGAL_TRANSITION",
            RideError::ForbiddenActor => "FORBIDDEN_ACTOR",
            RideError::Validation(_) => "VALIDATION_ERROR",
            RideError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

/// Errores principales de la aplicación (capa HTTP)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ride(#[from] RideError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Simulated server error")]
    SimulatedFailure,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            AppError::Ride(err) => {
                let message = err.to_string();
                let code = err.code().to_string();
                match err {
                    RideError::NotFound => (
                        StatusCode::NOT_FOUND,
                        ErrorResponse {
                            error: "Not Found".to_string(),
                            message,
                            details: None,
                            code,
                        },
                    ),
                    RideError::IllegalTransition { from, to } => {
                        tracing::warn!("⚠️ Transición rechazada: {} -> {}", from, to);
                        (
                            StatusCode::CONFLICT,
                            ErrorResponse {
                                error: "Conflict".to_string(),
                                message,
                                details: Some(json!({ "from": from, "to": to })),
                                code,
                            },
                        )
                    }
                    RideError::NotStarted(status) => (
                        StatusCode::CONFLICT,
                        ErrorResponse {
                            error: "Conflict".to_string(),
                            message,
                            details: Some(json!({ "status": status })),
                            code,
                        },
                    ),
                    RideError::ForbiddenActor => (
                        StatusCode::FORBIDDEN,
                        ErrorResponse {
                            error: "Forbidden".to_string(),
                            message,
                            details: None,
                            code,
                        },
                    ),
                    RideError::Validation(_) => (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse {
                            error: "Validation Error".to_string(),
                            message,
                            details: None,
                            code,
                        },
                    ),
                    RideError::Persistence(msg) => {
                        tracing::error!("❌ Error de persistencia: {}", msg);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            ErrorResponse {
                                error: "Persistence Error".to_string(),
                                message: "The change was applied but could not be persisted"
                                    .to_string(),
                                details: Some(json!({ "persistence_error": msg })),
                                code,
                            },
                        )
                    }
                }
            }

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: "VALIDATION_ERROR".to_string(),
                },
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: msg,
                    details: None,
                    code: "VALIDATION_ERROR".to_string(),
                },
            ),

            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse {
                    error: "Unauthorized".to_string(),
                    message: msg,
                    details: None,
                    code: "UNAUTHORIZED".to_string(),
                },
            ),

            AppError::SimulatedFailure => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Internal Server Error".to_string(),
                    message: "Simulated server error".to_string(),
                    details: None,
                    code: "SIMULATED_FAILURE".to_string(),
                },
            ),

            AppError::Internal(msg) => {
                tracing::error!("❌ Error interno: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: "An unexpected error occurred".to_string(),
                        details: Some(json!({ "internal_error": msg })),
                        code: "INTERNAL_ERROR".to_string(),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Resultado tipado para operaciones de la API
pub type AppResult<T> = Result<T, AppError>;

/// Resultado tipado para operaciones del núcleo
pub type RideResult<T> = Result<T, RideError>;

/// Función helper para crear errores de validación
pub fn validation_error(message: &str) -> RideError {
    RideError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RideError::NotFound, StatusCode::NOT_FOUND),
            (
                RideError::IllegalTransition {
                    from: RideStatus::Completed,
                    to: RideStatus::Started,
                },
                StatusCode::CONFLICT,
            ),
            (RideError::NotStarted(RideStatus::Completed), StatusCode::CONFLICT),
            (RideError::ForbiddenActor, StatusCode::FORBIDDEN),
            (validation_error("lat"), StatusCode::BAD_REQUEST),
            (RideError::Persistence("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(RideError::NotFound.code(), "NOT_FOUND");
        assert_eq!(RideError::ForbiddenActor.code(), "FORBIDDEN_ACTOR");
        assert_eq!(RideError::NotStarted(RideStatus::Accepted).code(), "ILLEGAL_TRANSITION");
        let illegal = RideError::IllegalTransition {
            from: RideStatus::Requested,
            to: RideStatus::Completed,
        };
        assert_eq!(illegal.code(), "ILLEGAL_TRANSITION");
    }
}
