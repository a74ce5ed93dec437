//! The analytics sink contract: fire-and-
//! forget event emission. Only a no-op implementation ships; a real sink is
//! a deployment-time concern.

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Emit one named event with an opaque JSON payload. Implementations
    /// must not propagate failures back to the caller — analytics is best
    /// effort by contract.
    async fn emit(&self, event: &str, payload: Value);
}

pub struct NoopAnalyticsSink;

#[async_trait]
impl AnalyticsSink for NoopAnalyticsSink {
    async fn emit(&self, _event: &str, _payload: Value) {}
}
