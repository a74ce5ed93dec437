//! The chat transport adapter contract — an external collaborator.
//! The core only ever produces `(chat_id, html_text, buttons)` triples; how
//! they reach the user is entirely the transport adapter's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One inline keyboard button: visible `text` plus the opaque
/// `callback_data` the transport adapter echoes back on `POST /callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport send failed: {0}")]
    SendFailed(String),
}

/// Outbound delivery contract. `buttons` is a grid: each inner `Vec` is one
/// keyboard row.
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn send(
        &self,
        chat_id: &str,
        html_text: &str,
        buttons: Option<Vec<Vec<Button>>>,
    ) -> Result<(), TransportError>;
}

/// Discards every send. Used where a `TransportSink` is required by a
/// signature but the caller only cares about the store side effects (unit
/// tests, dry runs).
pub struct NoopTransportSink;

#[async_trait]
impl TransportSink for NoopTransportSink {
    async fn send(
        &self,
        _chat_id: &str,
        _html_text: &str,
        _buttons: Option<Vec<Vec<Button>>>,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}
