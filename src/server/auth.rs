//! Shared-secret API key middleware.
//!
//! Data endpoints require an `x-api-key` header equal to the configured
//! secret. Health and metrics stay open.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::state::AppState;
use crate::error::ReelcastError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Compare SHA-256 digests of both keys in constant time, so neither the
/// contents nor the length of the configured key leak through timing.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let provided = Sha256::digest(provided);
    let expected = Sha256::digest(expected);
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

/// Axum middleware: reject requests without a valid API key.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .is_some_and(|value| keys_match(value.as_bytes(), state.config.api_key.as_bytes()));

    if !authorized {
        warn!("Rejected {} {}: missing or invalid API key", req.method(), req.uri().path());
        return ReelcastError::Unauthorized.into_response();
    }

    next.run(req).await
}
