use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};
use waypoint_core::transport::TransportError;
use waypoint_store::StoreError;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl IntoTaxonomy for NotifyError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            NotifyError::Store(e) => e.taxonomy(),
            NotifyError::Transport(_) => ErrorTaxonomy::TransportSendFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
