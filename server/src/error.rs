use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use streambridge::{IndexerError, MagnetError, StreamError, TranscoderError};
use thiserror::Error;

/// Request-boundary error taxonomy. Every handler returns
/// `Result<_, ApiError>`; nothing is allowed to crash the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Indexer(#[from] IndexerError),
    #[error("stream not available, upstream returned {0}")]
    StreamUnavailable(u16),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TranscoderError> for ApiError {
    fn from(err: TranscoderError) -> Self {
        ApiError::Stream(StreamError::Transcoder(err))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::FORBIDDEN,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Stream(StreamError::Magnet(MagnetError::InvalidMagnetFormat))
            | ApiError::Stream(StreamError::Magnet(MagnetError::InfoHashMissing)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Stream(StreamError::Transcoder(TranscoderError::Timeout(_))) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Stream(_) | ApiError::Indexer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
