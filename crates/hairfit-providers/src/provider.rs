//! The provider strategy trait and HTTP helpers shared by providers.

use std::time::Duration;

use async_trait::async_trait;
use hairfit_core::{check_remote_url, Error, ImageData, ImageSource, Result, TransformRequest};

/// One image-generation backend in the fallback chain.
#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Stable identifier ("gemini", "replicate", ...).
    fn id(&self) -> &str;

    /// Whether this provider returns placeholders instead of generations.
    fn is_demo(&self) -> bool {
        false
    }

    /// Try to produce the transformed image.
    async fn attempt(&self, request: &TransformRequest) -> Result<ImageData>;
}

/// Build the outbound HTTP client used by a provider.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into a provider error carrying status and body.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        Error::Provider(format!("{} returned {}", provider, status))
    } else {
        Error::Provider(format!("{} returned {}: {}", provider, status, truncate(body, 300)))
    }
}

/// Read a response body as an image, trusting an `image/*` content type.
pub(crate) async fn response_image(response: reqwest::Response) -> Result<ImageData> {
    let content_type = content_type(&response);
    let bytes = response.bytes().await?.to_vec();
    into_image(content_type, bytes)
}

/// Policy applied when a provider downloads a remote image reference.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RemoteImageLimits {
    pub max_bytes: u64,
    pub allow_insecure: bool,
}

/// Resolve an image reference to bytes, downloading remote URLs.
///
/// Remote URLs must pass [`check_remote_url`]. Bodies over `max_bytes` fail
/// with `PayloadTooLarge`, checked against `Content-Length` first and then
/// while streaming.
pub(crate) async fn resolve_image(
    client: &reqwest::Client,
    provider: &str,
    source: &ImageSource,
    limits: RemoteImageLimits,
) -> Result<ImageData> {
    let url = match source {
        ImageSource::Inline(data) => return Ok(data.clone()),
        ImageSource::Remote(url) => check_remote_url(url, limits.allow_insecure)?,
    };

    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(status_error(provider, response).await);
    }
    let limit = limits.max_bytes;
    if let Some(size) = response.content_length() {
        if size > limit {
            return Err(Error::PayloadTooLarge { size, limit });
        }
    }

    let content_type = content_type(&response);
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let size = (bytes.len() + chunk.len()) as u64;
        if size > limit {
            return Err(Error::PayloadTooLarge { size, limit });
        }
        bytes.extend_from_slice(&chunk);
    }
    into_image(content_type, bytes)
}

fn content_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
}

fn into_image(content_type: Option<String>, bytes: Vec<u8>) -> Result<ImageData> {
    match content_type {
        Some(mime) if mime.starts_with("image/") && !bytes.is_empty() => {
            Ok(ImageData::new(mime, bytes))
        }
        _ => ImageData::from_bytes(bytes),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
