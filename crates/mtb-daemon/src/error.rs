//! Error taxonomy for HTTP handlers and its mapping to status codes.
//!
//! | variant               | status | when                                            |
//! |-----------------------|--------|-------------------------------------------------|
//! | `Unauthorized`        | 401    | missing / wrong `x-api-key`                     |
//! | `Validation`          | 400    | malformed body or query                         |
//! | `UnknownSymbol`       | 400    | terminal does not know the symbol               |
//! | `UpstreamUnavailable` | 500    | terminal down, no tick, `order_send` gave none  |
//! | `UpstreamRejected`    | 500    | terminal returned its own failure code          |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mtb_terminal::{OrderError, TerminalError};
use thiserror::Error;
use tracing::warn;

use crate::api_types::ErrorResponse;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Symbol {0} not found in terminal")]
    UnknownSymbol(String),

    /// `code` is the terminal's `last_error()` code when one was captured.
    #[error("{detail}")]
    UpstreamUnavailable { detail: String, code: Option<i64> },

    #[error("terminal error ({code}): {message}")]
    UpstreamRejected { code: i64, message: String },
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::Unauthorized => StatusCode::UNAUTHORIZED,
            BridgeError::Validation(_) | BridgeError::UnknownSymbol(_) => StatusCode::BAD_REQUEST,
            BridgeError::UpstreamUnavailable { .. } | BridgeError::UpstreamRejected { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> Option<i64> {
        match self {
            BridgeError::UpstreamUnavailable { code, .. } => *code,
            BridgeError::UpstreamRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<TerminalError> for BridgeError {
    fn from(e: TerminalError) -> Self {
        match e {
            TerminalError::Rejected { code, message } => {
                BridgeError::UpstreamRejected { code, message }
            }
            TerminalError::InitializeFailed(c) => BridgeError::UpstreamRejected {
                code: c.code,
                message: c.message,
            },
            other @ (TerminalError::Disconnected(_)
            | TerminalError::Protocol(_)
            | TerminalError::WorkerStopped) => BridgeError::UpstreamUnavailable {
                detail: other.to_string(),
                code: None,
            },
        }
    }
}

impl From<OrderError> for BridgeError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownSymbol(symbol) => BridgeError::UnknownSymbol(symbol),
            OrderError::NoTick(_) => BridgeError::UpstreamUnavailable {
                detail: e.to_string(),
                code: None,
            },
            OrderError::SendReturnedNothing(ref diag) => BridgeError::UpstreamUnavailable {
                code: Some(diag.code),
                detail: e.to_string(),
            },
            OrderError::Terminal(inner) => inner.into(),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "upstream failure");
        }
        let body = ErrorResponse {
            detail: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
