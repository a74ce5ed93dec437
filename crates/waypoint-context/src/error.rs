use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("store error: {0}")]
    Store(#[from] waypoint_store::StoreError),
}

impl IntoTaxonomy for ContextError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            ContextError::Store(_) => ErrorTaxonomy::StoreTransient,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContextError>;
