use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error")]
    DatabaseError(sqlx::Error),

    /// A single request field failed a check the validator derives can't express.
    #[error("{field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Resource not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),
}

impl AppError {
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field,
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidField { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// JSON body of every error response.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<ValidationErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                ErrorBody {
                    error: "Database error".to_string(),
                    field: None,
                    details: None,
                }
            }
            AppError::InvalidField { field, message } => ErrorBody {
                error: message,
                field: Some(field),
                details: None,
            },
            AppError::NotFound => ErrorBody {
                error: "Resource not found".to_string(),
                field: None,
                details: None,
            },
            AppError::ValidationError(errors) => ErrorBody {
                error: format!("Input validation failed: {errors}").replace('\n', ", "),
                field: None,
                details: Some(errors),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound,
            other => AppError::DatabaseError(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}
