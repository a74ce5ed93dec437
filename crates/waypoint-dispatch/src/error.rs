use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] waypoint_store::StoreError),

    #[error(transparent)]
    Intent(#[from] waypoint_intent::IntentError),

    #[error(transparent)]
    Dialog(#[from] waypoint_dialog::DialogError),

    #[error(transparent)]
    ResultCache(#[from] waypoint_resultcache::ResultCacheError),

    #[error(transparent)]
    Planner(#[from] waypoint_planner::PlannerError),

    #[error(transparent)]
    Context(#[from] waypoint_context::ContextError),

    #[error("invalid request: {0}")]
    InvalidParams(String),
}

impl IntoTaxonomy for DispatchError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            DispatchError::Store(e) => e.taxonomy(),
            DispatchError::Intent(e) => e.taxonomy(),
            DispatchError::Dialog(e) => e.taxonomy(),
            DispatchError::ResultCache(e) => e.taxonomy(),
            DispatchError::Planner(e) => e.taxonomy(),
            DispatchError::Context(e) => e.taxonomy(),
            DispatchError::InvalidParams(_) => ErrorTaxonomy::IntentInvalid,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
