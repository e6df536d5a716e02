//! Hugging Face inference API provider.
//!
//! Each configured model is tried in order. Identity-preserving models
//! (InstantID) get the source photo and a hairstyle prompt; any other model is
//! treated as plain text-to-image and only gets the prompt. The response body
//! is the image itself.

use async_trait::async_trait;
use hairfit_core::{Error, ImageData, Result, TransformRequest};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::HuggingFaceConfig;
use crate::prompts;
use crate::provider::{http_client, response_image, status_error, TransformProvider};

pub const PROVIDER_ID: &str = "huggingface";

pub struct HuggingFaceProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

fn is_identity_model(model: &str) -> bool {
    model.to_ascii_lowercase().contains("instantid")
}

/// Request body for `model`.
fn request_body(model: &str, request: &TransformRequest) -> Value {
    if is_identity_model(model) {
        json!({
            "inputs": {
                "image": request.source_image.to_data_url(),
                "prompt": prompts::identity_prompt(&request.style_prompt),
                "negative_prompt": prompts::IDENTITY_NEGATIVE_PROMPT,
            }
        })
    } else {
        json!({
            "inputs": prompts::portrait_prompt(&request.style_prompt),
            "parameters": {
                "negative_prompt": prompts::PORTRAIT_NEGATIVE_PROMPT,
                "num_inference_steps": prompts::PORTRAIT_INFERENCE_STEPS,
            }
        })
    }
}

impl HuggingFaceProvider {
    pub fn new(config: &HuggingFaceConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("Hugging Face api_key is not set".to_string()))?;
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
        })
    }

    #[instrument(skip(self, model, request), fields(subsystem = "providers", component = "huggingface", op = "infer", model = %model))]
    async fn infer(&self, model: &str, request: &TransformRequest) -> Result<ImageData> {
        let url = format!("{}/models/{}", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body(model, request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER_ID, response).await);
        }
        response_image(response).await
    }
}

#[async_trait]
impl TransformProvider for HuggingFaceProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn attempt(&self, request: &TransformRequest) -> Result<ImageData> {
        let mut failures = Vec::new();
        for model in &self.models {
            match self.infer(model, request).await {
                Ok(image) => {
                    debug!(
                        subsystem = "providers",
                        component = "huggingface",
                        model = %model,
                        bytes = image.len(),
                        "Hugging Face produced an image"
                    );
                    return Ok(image);
                }
                Err(e) => {
                    warn!(
                        subsystem = "providers",
                        component = "huggingface",
                        model = %model,
                        error = %e,
                        "Hugging Face model failed, trying next"
                    );
                    failures.push(format!("{}: {}", model, e));
                }
            }
        }
        Err(Error::Provider(format!(
            "huggingface: all models failed ({})",
            failures.join("; ")
        )))
    }
}
