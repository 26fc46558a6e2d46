//! `x-api-key` gate for protected routes.
//!
//! Installed with `route_layer`, so it runs before any extractor of the
//! protected handlers: an unauthenticated request is refused before its body
//! is read and never reaches the terminal worker.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::BridgeError, state::AppState};

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(
    State(st): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| st.api_key.matches(token));

    if !authorized {
        warn!(path = %req.uri().path(), "rejected request with missing or bad api key");
        return BridgeError::Unauthorized.into_response();
    }
    next.run(req).await
}
