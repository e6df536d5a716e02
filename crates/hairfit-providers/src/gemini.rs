//! Gemini image-editing provider.
//!
//! Sends both images inline to `models/{model}:generateContent` and reads the
//! first inline image part of the first candidate. Models are tried in order.

use async_trait::async_trait;
use base64::Engine;
use hairfit_core::{Error, ImageData, Result, TransformRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::GeminiConfig;
use crate::prompts;
use crate::provider::{
    http_client, resolve_image, status_error, RemoteImageLimits, TransformProvider,
};

pub const PROVIDER_ID: &str = "gemini";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
    style_limits: RemoteImageLimits,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("Gemini api_key is not set".to_string()))?;
        Ok(Self {
            client: http_client(timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
            style_limits: RemoteImageLimits {
                max_bytes: config.style_image_max_bytes,
                allow_insecure: config.allow_insecure_style_urls,
            },
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    #[instrument(skip(self, model, body), fields(subsystem = "providers", component = "gemini", op = "generate", model = %model))]
    async fn generate(&self, model: &str, body: &GenerateRequest) -> Result<ImageData> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER_ID, response).await);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("gemini response parse failed: {}", e)))?;
        parsed.first_image()
    }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn image(image: &ImageData) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type().to_string(),
                data: image.to_base64(),
            }),
        }
    }
}

impl GenerateResponse {
    fn first_image(self) -> Result<ImageData> {
        let inline = self
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .ok_or_else(|| Error::Provider("gemini returned no image".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.trim())
            .map_err(|e| Error::Provider(format!("gemini returned invalid image data: {}", e)))?;
        Ok(ImageData::new(inline.mime_type, bytes))
    }
}

#[async_trait]
impl TransformProvider for GeminiProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn attempt(&self, request: &TransformRequest) -> Result<ImageData> {
        let style = resolve_image(
            &self.client,
            PROVIDER_ID,
            &request.style_image,
            self.style_limits,
        )
        .await?;
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(prompts::edit_instruction(
                        &request.style_name,
                        &request.style_prompt,
                    )),
                    Part::image(&request.source_image),
                    Part::image(&style),
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        let mut failures = Vec::new();
        for model in &self.models {
            match self.generate(model, &body).await {
                Ok(image) => {
                    debug!(
                        subsystem = "providers",
                        component = "gemini",
                        model = %model,
                        bytes = image.len(),
                        "Gemini produced an image"
                    );
                    return Ok(image);
                }
                Err(e) => {
                    warn!(
                        subsystem = "providers",
                        component = "gemini",
                        model = %model,
                        error = %e,
                        "Gemini model failed, trying next"
                    );
                    failures.push(format!("{}: {}", model, e));
                }
            }
        }
        Err(Error::Provider(format!(
            "gemini: all models failed ({})",
            failures.join("; ")
        )))
    }
}
