//! Errors returned to inbound webhook senders

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ding2wechat_core::TranslationError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unknown receiver: {0:?}")]
    UnknownReceiver(String),

    #[error("unable to decode dingtalk request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("unable to translate message: {0}")]
    Translation(#[from] TranslationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownReceiver(_) | Self::MalformedBody(_) | Self::Translation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = if status.is_server_error() {
            error!("{}", self);
            "unknown error"
        } else {
            warn!("Rejected relay request: {}", self);
            "bad request"
        };
        (status, body).into_response()
    }
}
