use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("store error: {0}")]
    Store(#[from] waypoint_store::StoreError),

    #[error("malformed state_context: {0}")]
    MalformedStateContext(String),

    #[error("state_context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoTaxonomy for DialogError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            DialogError::Store(_) => ErrorTaxonomy::StoreTransient,
            DialogError::MalformedStateContext(_) => ErrorTaxonomy::IntentInvalid,
            DialogError::Serialization(_) => ErrorTaxonomy::StoreTransient,
        }
    }
}

pub type Result<T> = std::result::Result<T, DialogError>;
