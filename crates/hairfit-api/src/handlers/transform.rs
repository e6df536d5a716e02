//! Transform proxy endpoint.
//!
//! Accepts `{sourceImage, styleImage, styleName, stylePrompt, provider?}` and
//! answers `{success: true, result, provider, demo}`, or a non-2xx
//! `{success: false, error}`.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use hairfit_core::{check_remote_url, Error, ImageSource, TransformRequest, TransformResponse};
use tracing::{info, warn};

use crate::error::TransformError;
use crate::state::AppState;

/// Run the provider chain for one request.
///
/// # Returns
/// - 200 OK with the generated image as a data URL
/// - 400 Bad Request if the body is not a valid request or the style image
///   URL is not a public https URL
/// - 413 Payload Too Large if the source photo or a downloaded style image
///   exceeds the limit
/// - 502 Bad Gateway if every provider failed
pub async fn transform(
    State(state): State<AppState>,
    payload: Result<Json<TransformRequest>, JsonRejection>,
) -> Result<Json<TransformResponse>, TransformError> {
    let Json(request) = payload?;

    let size = request.source_image.len() as u64;
    let limit = state.config.max_photo_bytes;
    if size > limit {
        return Err(Error::PayloadTooLarge { size, limit }.into());
    }
    if let ImageSource::Remote(url) = &request.style_image {
        check_remote_url(url, state.config.allow_insecure_style_urls)?;
    }

    let start = Instant::now();
    let style_name = request.style_name.clone();
    match state.transformer.transform(request).await {
        Ok(result) => {
            info!(
                subsystem = "api",
                op = "transform",
                style = %style_name,
                provider = result.provider.as_deref().unwrap_or("unknown"),
                demo = result.demo,
                bytes = result.image.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Transform completed"
            );
            Ok(Json(result.into()))
        }
        Err(e) => {
            warn!(
                subsystem = "api",
                op = "transform",
                style = %style_name,
                error = %e,
                duration_ms = start.elapsed().as_millis() as u64,
                "Transform failed"
            );
            Err(e.into())
        }
    }
}
