use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tether_core::LinkError;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    Link(LinkError),
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        AppError::Link(err)
    }
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Link(err) => match err {
                LinkError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                LinkError::InvalidExpiry(_) => (StatusCode::BAD_REQUEST, "invalid_expiry"),
                LinkError::DuplicateCode(_) => (StatusCode::CONFLICT, "duplicate_code"),
                LinkError::ExhaustedKeyspace(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "exhausted_keyspace")
                }
                LinkError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                LinkError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                LinkError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
                LinkError::StorageUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
                }
                LinkError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match self {
            AppError::BadRequest(message) => message,
            AppError::Link(err) => err.to_string(),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = kind, %message, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
            }),
        )
            .into_response()
    }
}
