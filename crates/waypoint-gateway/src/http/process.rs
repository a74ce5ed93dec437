//! `POST /process` — the inbound chat message entry point.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use waypoint_core::taxonomy::ErrorTaxonomy;
use waypoint_core::types::UserId;
use waypoint_dispatch::ProcessResponse;

use crate::app::{with_deadline, AppState};
use crate::auth::check_auth;

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub user_id: String,
    pub message: String,
    /// Optional typed hints from the transport adapter. The core does not
    /// define any recognized hint keys the Context Assembler reads, except
    /// `voice_blob` — speech-to-text is an out-of-scope collaborator (§1),
    /// so that one key is rejected with a typed "unsupported" error rather
    /// than silently dropped or transcribed.
    #[serde(default)]
    pub context: Option<Value>,
}

pub async fn process_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, StatusCode> {
    if !check_auth(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    if has_voice_blob(&req.context) {
        return Ok(Json(ProcessResponse::from_taxonomy(ErrorTaxonomy::UnsupportedInput)));
    }

    let user_id = UserId::from(req.user_id);
    let response = with_deadline(&state, state.orchestrator.process_message(&user_id, &req.message)).await;
    Ok(Json(response))
}

fn has_voice_blob(context: &Option<Value>) -> bool {
    context
        .as_ref()
        .and_then(|v| v.get("voice_blob"))
        .is_some_and(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_voice_blob_key_is_detected_regardless_of_other_context_fields() {
        let context = Some(serde_json::json!({"voice_blob": "base64...", "hint": "x"}));
        assert!(has_voice_blob(&context));
    }

    #[test]
    fn a_null_voice_blob_does_not_count_as_present() {
        let context = Some(serde_json::json!({"voice_blob": null}));
        assert!(!has_voice_blob(&context));
    }

    #[test]
    fn no_context_or_no_voice_blob_key_is_not_flagged() {
        assert!(!has_voice_blob(&None));
        assert!(!has_voice_blob(&Some(serde_json::json!({"hint": "x"}))));
    }
}
