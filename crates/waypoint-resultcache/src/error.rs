use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum ResultCacheError {
    #[error("result set {0} not found or expired")]
    SetNotFound(String),

    #[error("ordinal {ordinal} out of range for a result set of {len} items")]
    OrdinalOutOfRange { ordinal: usize, len: usize },
}

impl IntoTaxonomy for ResultCacheError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        ErrorTaxonomy::ReferencesUnknownEntity
    }
}

pub type Result<T> = std::result::Result<T, ResultCacheError>;
