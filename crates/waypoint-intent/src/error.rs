use thiserror::Error;
use waypoint_core::model::ModelAdapterError;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("intent parser timed out")]
    IntentTimeout,

    #[error("could not parse model output as JSON: {0}")]
    IntentParseError(String),

    #[error("intent invalid: {0}")]
    IntentInvalid(String),

    #[error("intent references an unknown entity")]
    IntentReferencesUnknownEntity,
}

impl From<ModelAdapterError> for IntentError {
    fn from(e: ModelAdapterError) -> Self {
        match e {
            ModelAdapterError::Timeout(_) => IntentError::IntentTimeout,
            ModelAdapterError::Transport(msg) => IntentError::IntentParseError(msg),
        }
    }
}

impl IntoTaxonomy for IntentError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            IntentError::IntentTimeout => ErrorTaxonomy::IntentTimeout,
            IntentError::IntentParseError(_) => ErrorTaxonomy::IntentParseError,
            IntentError::IntentInvalid(_) => ErrorTaxonomy::IntentInvalid,
            IntentError::IntentReferencesUnknownEntity => ErrorTaxonomy::ReferencesUnknownEntity,
        }
    }
}

pub type Result<T> = std::result::Result<T, IntentError>;
