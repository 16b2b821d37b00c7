use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::json;
use thiserror::Error;
use tracing::error;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(mongodb::error::Error),

    #[error("Collection not set to be exposed to REST clients: {0}")]
    CollectionNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid ObjectId: {0}")]
    InvalidId(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Internal server error")]
    Internal,
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        // Bulk inserts report per-document failures carrying the server's E11000 message.
        _ => err.to_string().contains("E11000"),
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            AppError::DuplicateKey(err.to_string())
        } else {
            AppError::Database(err)
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::CollectionNotFound(_) | AppError::DocumentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidId(_) | AppError::DuplicateKey(_) | AppError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UserExists(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Database(e) => {
                error!("Database error: {e}");
                "Internal server error".to_string()
            }
            AppError::Internal => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
