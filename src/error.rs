use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl DashboardError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Network(_) | Self::Parse(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Io(_) | Self::Snapshot(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorBody { status: self.to_string() })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DashboardError::Network("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            DashboardError::invalid_input("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DashboardError::not_found("food 1").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_message_is_user_visible() {
        let err = DashboardError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}
