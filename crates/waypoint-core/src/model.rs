//! The language model adapter contract. This crate
//! ships only the trait — the intent parser, the goal decomposer and the
//! summarizer all drive the same single-shot request/response contract
//! through it; the one concrete implementation (a generic HTTP client)
//! lives in the gateway binary, the only place that reads the model's
//! configured endpoint.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelAdapterError {
    #[error("model adapter timed out after {0:?}")]
    Timeout(Duration),

    #[error("model adapter transport error: {0}")]
    Transport(String),
}

/// A single-shot completion call: render a prompt, get back raw text.
///
/// Every caller in this workspace (intent parsing, goal decomposition,
/// result summarization) is JSON-in/JSON-out over this one method — there
/// is no streaming variant, since nothing downstream consumes partial
/// tokens.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, ModelAdapterError>;
}
