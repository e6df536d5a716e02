//! Replicate prediction provider.
//!
//! Creates a prediction, then polls its `urls.get` at a fixed interval for a
//! bounded number of attempts. The first output URL is downloaded and returned.

use std::time::Duration;

use async_trait::async_trait;
use hairfit_core::{Error, ImageData, Result, TransformRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, trace};

use crate::config::ReplicateConfig;
use crate::prompts;
use crate::provider::{http_client, response_image, status_error, TransformProvider};

pub const PROVIDER_ID: &str = "replicate";

pub struct ReplicateProvider {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    version: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    status: String,
    urls: Option<PredictionUrls>,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: String,
}

enum PollState {
    Succeeded(String),
    Failed(String),
    Pending,
}

impl Prediction {
    fn state(&self) -> PollState {
        match self.status.as_str() {
            "succeeded" => match first_output_url(&self.output) {
                Some(url) => PollState::Succeeded(url),
                None => PollState::Failed("prediction succeeded without output".to_string()),
            },
            "failed" | "canceled" => PollState::Failed(match &self.error {
                Value::String(s) => s.clone(),
                Value::Null => format!("prediction {}", self.status),
                other => other.to_string(),
            }),
            _ => PollState::Pending,
        }
    }
}

/// The output is either a single URL or a list of URLs.
fn first_output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(String::from)),
        _ => None,
    }
}

impl ReplicateProvider {
    pub fn new(config: &ReplicateConfig, timeout_secs: u64) -> Result<Self> {
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| Error::Config("Replicate api_token is not set".to_string()))?;
        let version = config
            .version
            .clone()
            .ok_or_else(|| Error::Config("Replicate version is not set".to_string()))?;
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token,
            version,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
        })
    }

    fn auth(&self) -> String {
        format!("Token {}", self.api_token)
    }

    async fn create(&self, request: &TransformRequest) -> Result<Prediction> {
        let body = json!({
            "version": self.version,
            "input": {
                "image": request.source_image.to_data_url(),
                "prompt": prompts::replicate_prompt(&request.style_prompt),
                "negative_prompt": prompts::REPLICATE_NEGATIVE_PROMPT,
                "ip_adapter_scale": prompts::REPLICATE_IP_ADAPTER_SCALE,
                "controlnet_conditioning_scale": prompts::REPLICATE_CONTROLNET_SCALE,
            }
        });
        let response = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_ID, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("replicate response parse failed: {}", e)))
    }

    /// Poll until the prediction finishes or the attempt budget runs out.
    #[instrument(skip(self), fields(subsystem = "providers", component = "replicate", op = "poll"))]
    async fn poll(&self, url: &str) -> Result<String> {
        for attempt in 1..=self.max_poll_attempts {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::AUTHORIZATION, self.auth())
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(status_error(PROVIDER_ID, response).await);
            }
            let prediction: Prediction = response
                .json()
                .await
                .map_err(|e| Error::Provider(format!("replicate poll parse failed: {}", e)))?;

            trace!(attempt, status = %prediction.status, "Replicate poll");
            match prediction.state() {
                PollState::Succeeded(output) => return Ok(output),
                PollState::Failed(reason) => {
                    return Err(Error::Provider(format!("replicate: {}", reason)))
                }
                PollState::Pending => {}
            }

            if attempt < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Err(Error::Timeout(format!(
            "replicate prediction still running after {} polls",
            self.max_poll_attempts
        )))
    }

    async fn download(&self, output: &str) -> Result<ImageData> {
        if output.starts_with("data:") {
            return ImageData::from_data_url(output);
        }
        let response = self.client.get(output).send().await?;
        if !response.status().is_success() {
            return Err(status_error(PROVIDER_ID, response).await);
        }
        response_image(response).await
    }
}

#[async_trait]
impl TransformProvider for ReplicateProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn attempt(&self, request: &TransformRequest) -> Result<ImageData> {
        let prediction = self.create(request).await?;
        let output = match prediction.state() {
            PollState::Succeeded(output) => output,
            PollState::Failed(reason) => {
                return Err(Error::Provider(format!("replicate: {}", reason)))
            }
            PollState::Pending => {
                let url = prediction
                    .urls
                    .map(|u| u.get)
                    .ok_or_else(|| Error::Provider("replicate returned no poll URL".to_string()))?;
                self.poll(&url).await?
            }
        };
        debug!(
            subsystem = "providers",
            component = "replicate",
            "Replicate prediction succeeded"
        );
        self.download(&output).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_output_url_variants() {
        assert_eq!(
            first_output_url(&json!("https://x/a.png")).as_deref(),
            Some("https://x/a.png")
        );
        assert_eq!(
            first_output_url(&json!(["https://x/a.png", "https://x/b.png"])).as_deref(),
            Some("https://x/a.png")
        );
        assert!(first_output_url(&json!(null)).is_none());
    }

    #[test]
    fn test_prediction_states() {
        let p: Prediction = serde_json::from_value(json!({"status": "processing"})).unwrap();
        assert!(matches!(p.state(), PollState::Pending));

        let p: Prediction =
            serde_json::from_value(json!({"status": "failed", "error": "NSFW"})).unwrap();
        assert!(matches!(p.state(), PollState::Failed(ref r) if r == "NSFW"));

        let p: Prediction =
            serde_json::from_value(json!({"status": "succeeded", "output": []})).unwrap();
        assert!(matches!(p.state(), PollState::Failed(_)));
    }

    #[test]
    fn test_new_requires_version() {
        let config = ReplicateConfig {
            api_token: Some("r8_x".into()),
            ..Default::default()
        };
        assert!(matches!(
            ReplicateProvider::new(&config, 5),
            Err(Error::Config(_))
        ));
    }
}
