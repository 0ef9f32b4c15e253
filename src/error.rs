use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::{
    auth_service::AuthServiceError, media_store::MediaError, user_service::UserServiceError,
};

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures a portal page cannot recover from. Form problems never get here;
/// they are rendered back into the page instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("User service error: {0}")]
    UserService(#[from] UserServiceError),

    #[error("Auth service error: {0}")]
    AuthService(#[from] AuthServiceError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}
