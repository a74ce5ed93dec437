use thiserror::Error;
use waypoint_core::taxonomy::{ErrorTaxonomy, IntoTaxonomy};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("goal {goal_id} not found")]
    GoalNotFound { goal_id: i64 },

    #[error("step {step_id} not found")]
    StepNotFound { step_id: i64 },

    #[error("event {event_id} not found")]
    EventNotFound { event_id: i64 },

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoTaxonomy for StoreError {
    fn taxonomy(&self) -> ErrorTaxonomy {
        match self {
            StoreError::Database(e) => match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    ErrorTaxonomy::StoreConstraint
                }
                _ => ErrorTaxonomy::StoreTransient,
            },
            StoreError::Constraint(_) => ErrorTaxonomy::StoreConstraint,
            StoreError::GoalNotFound { .. }
            | StoreError::StepNotFound { .. }
            | StoreError::EventNotFound { .. } => ErrorTaxonomy::ReferencesUnknownEntity,
            StoreError::Serialization(_) => ErrorTaxonomy::StoreTransient,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
