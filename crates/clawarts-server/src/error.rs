use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clawarts_core::CoreError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Archive error: {0}")]
    Archive(#[from] clickhouse::error::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                CoreError::WinnerNotFound(_) => (StatusCode::NOT_FOUND, "WINNER_NOT_FOUND"),
                CoreError::MissingParticipant(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "MISSING_PARTICIPANT")
                }
                CoreError::AlreadySettled(_) => (StatusCode::CONFLICT, "ALREADY_SETTLED"),
                CoreError::WorldNotInitialized => (StatusCode::CONFLICT, "WORLD_NOT_INITIALIZED"),
                CoreError::Invalid(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                CoreError::Overflow(_) => (StatusCode::BAD_REQUEST, "AMOUNT_OVERFLOW"),
            },
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Archive(_) => (StatusCode::BAD_GATEWAY, "ARCHIVE_ERROR"),
            AppError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error_code = %code, error = %message, "Request failed");
        } else if status == StatusCode::NOT_FOUND {
            tracing::info!(error_code = %code, error = %message, "Resource not found");
        } else {
            tracing::warn!(error_code = %code, error = %message, "Request rejected");
        }

        tracing::debug!(
            status_code = %status.as_u16(),
            error_code = %code,
            "Returning error response"
        );

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
