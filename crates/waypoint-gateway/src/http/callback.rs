//! `POST /callback` — the inbound button-press entry point.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use waypoint_core::types::UserId;
use waypoint_dispatch::ProcessResponse;

use crate::app::{with_deadline, AppState};
use crate::auth::check_auth;

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub user_id: String,
    pub callback_data: String,
}

pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<ProcessResponse>, StatusCode> {
    if !check_auth(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user_id = UserId::from(req.user_id);
    let response = with_deadline(&state, state.orchestrator.process_callback(&user_id, &req.callback_data)).await;
    Ok(Json(response))
}
