use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// A caller-supplied field that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct InputError {
    /// The name of the offending field, as it appears in the request payload.
    pub field: &'static str,
    /// A message that can be shown to the user as-is.
    pub message: String,
}

impl InputError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The user-visible outcomes that end a trip generation attempt.
///
/// None of these are retried automatically. `AuthRequired` and `AuthExpired`
/// leave the workflow waiting for a sign-in that resumes the attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripError {
    /// The selection is incomplete or out of range.
    #[error("{0}")]
    InvalidInput(InputError),

    /// Nobody is signed in.
    #[error("Please sign in to generate a trip")]
    AuthRequired,

    /// The stored credential no longer validates.
    #[error("Authentication expired. Please sign in again.")]
    AuthExpired,

    /// The identity provider did not accept the credential offered at sign-in.
    #[error("Failed to get user profile: {0}")]
    LoginFailed(String),

    /// The AI service failed or returned something that is not an itinerary.
    #[error("Trip generation failed: {0}")]
    GenerationFailed(String),

    /// The generated trip could not be stored.
    #[error("Failed to save trip data. Please try again.")]
    SaveFailed(String),

    /// The sign-in was accepted but the session could not be stored.
    #[error("Could not start your session. Please try again.")]
    SessionUnavailable(String),
}

impl TripError {
    /// Whether the caller should present the sign-in prompt.
    pub fn needs_sign_in(&self) -> bool {
        matches!(
            self,
            TripError::AuthRequired | TripError::AuthExpired | TripError::LoginFailed(_)
        )
    }
}

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A trip workflow outcome.
    #[error(transparent)]
    Workflow(#[from] TripError),

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The client already has a generation in flight.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Pool(_) | AppError::Redis(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Workflow(e) => match e {
                TripError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                TripError::AuthRequired | TripError::AuthExpired | TripError::LoginFailed(_) => {
                    StatusCode::UNAUTHORIZED
                }
                TripError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
                TripError::SaveFailed(_) | TripError::SessionUnavailable(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                sonic_rs::json!({ "error": "Database error" })
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                sonic_rs::json!({ "error": "Database error" })
            }

            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {}", e);
                sonic_rs::json!({ "error": "Cache error" })
            }

            AppError::Workflow(TripError::InvalidInput(ref input)) => {
                tracing::debug!("Invalid trip selection: {} ({})", input.message, input.field);
                sonic_rs::json!({ "error": input.message.as_str(), "field": input.field })
            }

            AppError::Workflow(ref e) if e.needs_sign_in() => {
                tracing::warn!("Sign-in required: {}", e);
                sonic_rs::json!({ "error": e.to_string(), "sign_in": true })
            }

            AppError::Workflow(ref e) => {
                tracing::error!("Trip workflow failed: {}", e);
                sonic_rs::json!({ "error": e.to_string() })
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                sonic_rs::json!({ "error": "Resource not found" })
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                sonic_rs::json!({ "error": msg.as_str() })
            }

            AppError::Conflict(ref msg) => {
                tracing::warn!("Conflict: {}", msg);
                sonic_rs::json!({ "error": msg.as_str() })
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                sonic_rs::json!({ "error": "Internal server error" })
            }
        };

        let body = sonic_rs::to_string(&body)
            .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
