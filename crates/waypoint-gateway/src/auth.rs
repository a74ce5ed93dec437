//! Bearer token check for `/process` and `/callback` — a single static
//! `transport_api_token` compared against the `Authorization: Bearer <token>`
//! header, no auth-mode enum needed since this contract only ever has one.

use axum::http::HeaderMap;

use crate::app::AppState;

pub fn check_auth(state: &AppState, headers: &HeaderMap) -> bool {
    extract_bearer(headers)
        .map(|token| token == state.transport_api_token)
        .unwrap_or(false)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
