use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use warbler_db::DbError;

/// Unanticipated failures. Validation problems, bad credentials, and denied
/// authorization are all ordinary responses; only genuine server faults land
/// here and become a 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("request failed: {self}");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
