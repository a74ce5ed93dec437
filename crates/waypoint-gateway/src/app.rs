//! Shared Axum state — exactly what the two HTTP entry points
//! need: the orchestrator and the inbound bearer token.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};
use waypoint_dispatch::{DispatchError, Orchestrator, ProcessResponse};

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub transport_api_token: String,
    /// §5: the deadline an inbound request is allowed to run for before
    /// it is cancelled and the caller gets the generic "try again" reply.
    pub request_timeout: Duration,
    /// Cancelled once at process shutdown so in-flight requests unwind
    /// instead of racing the listener teardown.
    pub shutdown_token: CancellationToken,
}

/// §5 cancellation: races the pipeline future against the process-wide
/// shutdown token and the per-request deadline, combining
/// `tokio_util::sync::CancellationToken` with `tokio::time::timeout` at the
/// top of the request handler. Cancellation never leaves a partial
/// transaction committed — the pipeline's own store transactions are each
/// atomic, so dropping the future mid-await simply abandons an uncommitted one.
pub async fn with_deadline(
    state: &AppState,
    fut: impl std::future::Future<Output = Result<ProcessResponse, DispatchError>>,
) -> ProcessResponse {
    tokio::select! {
        _ = state.shutdown_token.cancelled() => {
            ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentTimeout)
        }
        result = tokio::time::timeout(state.request_timeout, fut) => {
            match result {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => ProcessResponse::from_taxonomy(e.taxonomy()),
                Err(_elapsed) => ProcessResponse::from_taxonomy(ErrorTaxonomy::IntentTimeout),
            }
        }
    }
}

/// Assemble the full Axum router for the two contract entry points plus a
/// liveness probe.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/process", post(crate::http::process::process_handler))
        .route("/callback", post(crate::http::callback::callback_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_client::NullModelAdapter;
    use waypoint_core::config::WaypointConfig;
    use waypoint_resultcache::ResultSetCache;
    use waypoint_store::{SqliteStore, Store};

    fn state_with_timeout(timeout: Duration) -> AppState {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let model: Arc<dyn waypoint_core::model::ModelAdapter> = Arc::new(NullModelAdapter);
        let cache = ResultSetCache::new(64, 3600);
        let config = WaypointConfig::default();
        let orchestrator = Orchestrator::new(store, model, cache, &config);
        AppState {
            orchestrator,
            transport_api_token: "t".to_string(),
            request_timeout: timeout,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// A pipeline future that never resolves within the deadline must
    /// surface the generic "try again" response, not hang the handler.
    #[tokio::test]
    async fn a_pipeline_that_outruns_the_deadline_returns_the_generic_retry_message() {
        let state = state_with_timeout(Duration::from_millis(20));
        let never = std::future::pending::<Result<ProcessResponse, DispatchError>>();
        let response = with_deadline(&state, never).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("IntentTimeout"));
    }

    /// A future already cancelled via the shutdown token returns the same
    /// generic message, even with a generous deadline.
    #[tokio::test]
    async fn a_shutdown_token_already_cancelled_short_circuits_to_the_retry_message() {
        let state = state_with_timeout(Duration::from_secs(30));
        state.shutdown_token.cancel();
        let never = std::future::pending::<Result<ProcessResponse, DispatchError>>();
        let response = with_deadline(&state, never).await;
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("IntentTimeout"));
    }

    /// The happy path passes the pipeline's own response through unchanged.
    #[tokio::test]
    async fn a_pipeline_that_finishes_in_time_passes_its_response_through() {
        let state = state_with_timeout(Duration::from_secs(5));
        let ready = std::future::ready(Ok(ProcessResponse::final_text("ок")));
        let response = with_deadline(&state, ready).await;
        assert!(response.success);
        assert_eq!(response.text, "ок");
    }
}
