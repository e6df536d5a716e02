//! HTTP client for the transform endpoint.
//!
//! Lets a controller run against a remote proxy instead of an in-process
//! chain.

use std::time::Duration;

use async_trait::async_trait;
use hairfit_core::{
    defaults, Error, Result, TransformRequest, TransformResponse, TransformResult,
    TransformService,
};
use tracing::{debug, instrument};

pub struct HttpTransformClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransformClient {
    /// `endpoint` is the full URL of `POST /transform`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, defaults::TRANSFORM_TIMEOUT_SECS)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TransformService for HttpTransformClient {
    #[instrument(skip(self, request), fields(subsystem = "providers", component = "client", op = "transform"))]
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "Transform endpoint responded");

        match serde_json::from_str::<TransformResponse>(&body) {
            Ok(parsed) if status.is_success() => parsed.into_result(),
            Ok(parsed) => Err(Error::Provider(
                parsed
                    .error
                    .unwrap_or_else(|| format!("transform endpoint returned {}", status)),
            )),
            Err(_) => {
                // Fall back to a bare {"error": "..."} body.
                let error = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                    .unwrap_or_else(|| format!("transform endpoint returned {}", status));
                Err(Error::Provider(error))
            }
        }
    }
}
