//! The one concrete [`ModelAdapter`] this workspace ships: a generic HTTP
//! POST to `model.adapter_url`, a thin `reqwest::Client` wrapper around one
//! endpoint, deliberately vendor-agnostic — the language model adapter is
//! an external collaborator with no vendor contract specified, so this sends
//! `{prompt, temperature}` and returns the response body verbatim rather
//! than speaking any particular vendor's wire format.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;
use waypoint_core::model::{ModelAdapter, ModelAdapterError};

pub struct HttpModelAdapter {
    client: reqwest::Client,
    url: String,
}

impl HttpModelAdapter {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    temperature: f32,
}

#[async_trait]
impl ModelAdapter for HttpModelAdapter {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, ModelAdapterError> {
        let body = CompletionRequest { prompt, temperature };
        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelAdapterError::Timeout(timeout)
                } else {
                    ModelAdapterError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelAdapterError::Transport(format!("{status}: {text}")));
        }

        response
            .text()
            .await
            .map_err(|e| ModelAdapterError::Transport(e.to_string()))
    }
}

/// Used when no `model.adapter_url` is configured. Every call fails
/// immediately rather than the gateway silently refusing to start — the
/// rest of the pipeline (context assembly, dialog state, the store) is
/// still fully usable without a model, e.g. for exercising non-model-backed
/// callback flows in a deployment that hasn't wired a model yet.
pub struct NullModelAdapter;

#[async_trait]
impl ModelAdapter for NullModelAdapter {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f32,
        _timeout: Duration,
    ) -> Result<String, ModelAdapterError> {
        warn!("model adapter call attempted but no model.adapter_url is configured");
        Err(ModelAdapterError::Transport(
            "no model adapter configured".to_string(),
        ))
    }
}
