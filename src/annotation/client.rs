//! Annotation service clients

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::request::AnnotationRequest;
use crate::error::AnnotationError;

/// Upper bound on concurrent per-text requests
const MAX_CONCURRENT_REQUESTS: usize = 10;

/// Default request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Service answer for one text
#[derive(Debug, Clone, PartialEq)]
pub enum TextAnnotation {
    Records(Vec<Value>),
    /// No answer within the timeout; resolved as if nothing was detected
    TimedOut,
}

impl TextAnnotation {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, TextAnnotation::TimedOut)
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            TextAnnotation::Records(records) => records,
            TextAnnotation::TimedOut => Vec::new(),
        }
    }
}

impl From<Vec<Value>> for TextAnnotation {
    fn from(records: Vec<Value>) -> Self {
        TextAnnotation::Records(records)
    }
}

/// Source of raw annotation records
///
/// Implementations return one answer per text, in request order.
#[async_trait]
pub trait AnnotationClient: Send + Sync {
    async fn annotate(&self, request: &AnnotationRequest) -> Result<Vec<TextAnnotation>, AnnotationError>;
}

/// HTTP client for a Duckling-compatible annotation server
pub struct DucklingClient {
    client: Client,
    url: Url,
}

impl DucklingClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AnnotationError> {
        let url = Url::parse(url).map_err(|e| AnnotationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotationError::Transport {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn annotate_text(
        &self,
        request: &AnnotationRequest,
        text: &str,
    ) -> Result<TextAnnotation, AnnotationError> {
        let mut form = vec![
            ("text", text.to_string()),
            ("locale", request.locale.clone()),
            ("tz", request.timezone.clone()),
            ("dims", request.dims_json()),
            ("latent", request.latent.to_string()),
        ];
        if let Some(reftime) = request.reference_time_ms {
            form.push(("reftime", reftime.to_string()));
        }

        let response = match self.client.post(self.url.clone()).form(&form).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!(text = %text, error = %e, "Annotation service timed out, continuing without records");
                return Ok(TextAnnotation::TimedOut);
            }
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "Annotation service unreachable");
                return Err(AnnotationError::Transport {
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map(TextAnnotation::Records)
            .map_err(|e| AnnotationError::Decode {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AnnotationClient for DucklingClient {
    async fn annotate(&self, request: &AnnotationRequest) -> Result<Vec<TextAnnotation>, AnnotationError> {
        tracing::debug!(url = %self.url, texts = request.texts.len(), "Requesting annotations");
        let requests: Vec<_> = request
            .texts
            .iter()
            .map(|text| self.annotate_text(request, text).boxed())
            .collect();
        stream::iter(requests)
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await
    }
}

/// Client answering from a fixed set of answers
///
/// Used for replaying recorded payloads.
#[derive(Debug, Clone, Default)]
pub struct StaticClient {
    responses: Vec<TextAnnotation>,
}

impl StaticClient {
    pub fn new(responses: Vec<Vec<Value>>) -> Self {
        Self::from_answers(responses.into_iter().map(TextAnnotation::from).collect())
    }

    pub fn from_answers(responses: Vec<TextAnnotation>) -> Self {
        Self { responses }
    }
}

#[async_trait]
impl AnnotationClient for StaticClient {
    async fn annotate(&self, _request: &AnnotationRequest) -> Result<Vec<TextAnnotation>, AnnotationError> {
        Ok(self.responses.clone())
    }
}
