use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use thiserror::Error as ThisError;

use crate::{
    menu::reorder::ReorderError,
    timing::{hours::HoursError, schedule::ScheduleError},
};

use super::myresponse::error_response;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("X-User-Id not provided.")]
    Unauthorized,

    #[error("Admin role required.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] HoursError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Reorder(#[from] ReorderError),

    #[error("Malformed body. {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read body. {0}")]
    Body(String),

    #[error("Request body is larger than {0} bytes.")]
    PayloadTooLarge(usize),

    #[error("Database error.\n{0}")]
    Database(#[from] rusqlite::Error),

    #[error("Could not get connection.\n{0}")]
    Pool(#[from] r2d2::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Validation(_)
            | ApiError::Schedule(_)
            | ApiError::Reorder(_)
            | ApiError::Json(_)
            | ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Database(_) | ApiError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server side failures are logged and reported without details.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            return error_response(status, "Internal server error");
        }
        error_response(status, &self.to_string())
    }
}
