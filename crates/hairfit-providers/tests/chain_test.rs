//! Fallback chain built from configuration, against mock provider servers.

use hairfit_core::{ImageData, ImageSource, TransformRequest, TransformService};
use hairfit_providers::{FallbackChain, ProviderKind, ProvidersConfig};
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> TransformRequest {
    TransformRequest {
        source_image: ImageData::new("image/png", vec![4, 4]),
        style_image: ImageSource::Inline(ImageData::new("image/png", vec![6])),
        style_name: "male perm 1".to_string(),
        style_prompt: "curly".to_string(),
        provider: None,
    }
}

#[tokio::test]
async fn test_gemini_failure_falls_back_to_huggingface() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&gemini)
        .await;
    let huggingface = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0xFF, 0xD8, 0xFF], "image/jpeg"))
        .expect(1)
        .mount(&huggingface)
        .await;

    let mut config = ProvidersConfig {
        chain: vec![ProviderKind::Gemini, ProviderKind::Replicate, ProviderKind::HuggingFace],
        timeout_secs: 5,
        ..ProvidersConfig::default()
    };
    config.gemini.api_key = Some("g".to_string());
    config.gemini.base_url = gemini.uri();
    config.gemini.models = vec!["gemini-a".to_string()];
    config.huggingface.api_key = Some("h".to_string());
    config.huggingface.base_url = huggingface.uri();
    config.huggingface.models = vec!["stabilityai/sdxl".to_string()];

    let chain = FallbackChain::from_config(&config, false).unwrap();
    // Replicate has no token, so it is not in the chain.
    assert_eq!(chain.provider_ids(), ["gemini", "huggingface"]);

    let result = chain.transform(request()).await.unwrap();
    assert_eq!(result.provider.as_deref(), Some("huggingface"));
    assert!(!result.demo);
    assert_eq!(result.image.mime_type(), "image/jpeg");
}

#[tokio::test]
async fn test_all_upstream_failures_with_demo_fallback() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&gemini)
        .await;

    let mut config = ProvidersConfig {
        chain: vec![ProviderKind::Gemini],
        timeout_secs: 5,
        ..ProvidersConfig::default()
    };
    config.gemini.api_key = Some("g".to_string());
    config.gemini.base_url = gemini.uri();
    config.gemini.models = vec!["gemini-a".to_string()];

    let chain = FallbackChain::from_config(&config, true).unwrap();
    let result = chain.transform(request()).await.unwrap();
    assert!(result.demo);
    assert_eq!(result.image.bytes(), &[4, 4]);
}

#[tokio::test]
async fn test_no_credentials_and_no_demo() {
    let chain = FallbackChain::from_config(&ProvidersConfig::default(), false).unwrap();
    assert!(chain.provider_ids().is_empty());
    let err = chain.transform(request()).await.unwrap_err();
    assert!(err.is_upstream());
}
