use thiserror::Error;
use waypoint_core::model::ModelAdapterError;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("store error: {0}")]
    Store(#[from] waypoint_store::StoreError),

    #[error("model adapter timed out during decomposition")]
    DecompositionTimeout,

    #[error("model adapter transport error during decomposition: {0}")]
    DecompositionTransport(String),

    #[error("could not place every step within the availability window")]
    PlacementFailure,
}

impl From<ModelAdapterError> for PlannerError {
    fn from(e: ModelAdapterError) -> Self {
        match e {
            ModelAdapterError::Timeout(_) => PlannerError::DecompositionTimeout,
            ModelAdapterError::Transport(msg) => PlannerError::DecompositionTransport(msg),
        }
    }
}

impl IntoTaxonomy for PlannerError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            PlannerError::Store(e) => e.taxonomy(),
            PlannerError::DecompositionTimeout => ErrorTaxonomy::IntentTimeout,
            PlannerError::DecompositionTransport(_) => ErrorTaxonomy::SchedulerPlacementFailure,
            PlannerError::PlacementFailure => ErrorTaxonomy::SchedulerPlacementFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
