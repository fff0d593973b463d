use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::BookingError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Booking(#[from] BookingError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// HTTP status for a domain failure.
pub fn booking_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::Unauthenticated => StatusCode::UNAUTHORIZED,
        BookingError::Forbidden | BookingError::WrongRecipient => StatusCode::FORBIDDEN,
        BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        BookingError::ModeConflict { .. }
        | BookingError::AlreadyReserved
        | BookingError::TableFull { .. }
        | BookingError::AlreadyProcessed
        | BookingError::DuplicateBooking
        | BookingError::InviterNotSeated
        | BookingError::PartnerUnavailable
        | BookingError::PartnerBookingFailed { .. }
        | BookingError::Conflict(_) => StatusCode::CONFLICT,
        BookingError::Expired => StatusCode::GONE,
        BookingError::WindowClosed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Validation(_) => StatusCode::BAD_REQUEST,
        BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::Booking(err @ BookingError::Store(store)) => {
                tracing::error!(error = %store, "Store failure");
                (
                    booking_status(err),
                    err.code(),
                    "An internal error occurred".into(),
                )
            }
            ApiError::Booking(err) => (booking_status(err), err.code(), err.to_string()),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::Conflict("Resource already exists".into()),
                Some("23503") => ApiError::NotFound("Referenced resource not found".into()),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();

        let message = if messages.len() == 1 {
            messages[0].clone()
        } else {
            format!("{} validation errors", messages.len())
        };

        ApiError::Validation(message)
    }
}
