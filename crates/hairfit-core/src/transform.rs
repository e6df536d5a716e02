//! Transform wire types and the service seam the controller calls through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::{ImageData, ImageSource};

/// Body of `POST /transform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub source_image: ImageData,
    pub style_image: ImageSource,
    pub style_name: String,
    pub style_prompt: String,
    /// Provider to try first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Body returned by `POST /transform`, on success and on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub success: bool,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub result: Option<ImageData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransformResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            provider: None,
            demo: false,
            error: Some(error.into()),
        }
    }

    /// Convert to a result, surfacing the `error` field verbatim.
    pub fn into_result(self) -> Result<TransformResult> {
        match (self.success, self.result) {
            (true, Some(image)) => Ok(TransformResult {
                image,
                provider: self.provider,
                demo: self.demo,
            }),
            (true, None) => Err(Error::Provider(
                "transform succeeded without a result image".to_string(),
            )),
            (false, _) => Err(Error::Provider(
                self.error
                    .unwrap_or_else(|| "transform failed".to_string()),
            )),
        }
    }
}

/// A generated image and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub image: ImageData,
    /// Provider id that produced the image, when known.
    pub provider: Option<String>,
    /// True when the image is a placeholder rather than a real generation.
    pub demo: bool,
}

impl From<TransformResult> for TransformResponse {
    fn from(result: TransformResult) -> Self {
        Self {
            success: true,
            result: Some(result.image),
            provider: result.provider,
            demo: result.demo,
            error: None,
        }
    }
}

/// Something that can turn a request into a generated image.
///
/// Implemented by the HTTP client for the proxy endpoint and by test doubles.
#[async_trait]
pub trait TransformService: Send + Sync {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = TransformRequest {
            source_image: ImageData::new("image/png", vec![1, 2, 3]),
            style_image: ImageSource::Remote("https://cdn.example.com/s.png".to_string()),
            style_name: "male cut 1".to_string(),
            style_prompt: "short".to_string(),
            provider: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "sourceImage": "data:image/png;base64,AQID",
                "styleImage": "https://cdn.example.com/s.png",
                "styleName": "male cut 1",
                "stylePrompt": "short"
            })
        );
    }

    #[test]
    fn test_request_rejects_non_image_source() {
        let value = json!({
            "sourceImage": "hello",
            "styleImage": "data:image/png;base64,AQID",
            "styleName": "x",
            "stylePrompt": "y"
        });
        assert!(serde_json::from_value::<TransformRequest>(value).is_err());
    }

    #[test]
    fn test_response_accepts_image_alias() {
        let response: TransformResponse = serde_json::from_value(json!({
            "success": true,
            "image": "data:image/png;base64,AQID"
        }))
        .unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.image.bytes(), &[1, 2, 3]);
        assert!(!result.demo);
    }

    #[test]
    fn test_failure_surfaces_error_verbatim() {
        let err = TransformResponse::failure("quota exhausted on all providers")
            .into_result()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider error: quota exhausted on all providers"
        );
    }

    #[test]
    fn test_failure_serialization_omits_result() {
        let value = serde_json::to_value(TransformResponse::failure("boom")).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "demo": false, "error": "boom"})
        );
    }
}
