//! Hugging Face provider against a mock HTTP server.

use hairfit_core::{ImageData, ImageSource, TransformRequest};
use hairfit_providers::{HuggingFaceConfig, HuggingFaceProvider, TransformProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

fn provider(server: &MockServer) -> HuggingFaceProvider {
    let config = HuggingFaceConfig {
        api_key: Some("hf_test".to_string()),
        base_url: server.uri(),
        models: vec![
            "InstantX/InstantID".to_string(),
            "stabilityai/sdxl-refiner".to_string(),
        ],
    };
    HuggingFaceProvider::new(&config, 5).unwrap()
}

fn request() -> TransformRequest {
    TransformRequest {
        source_image: ImageData::new("image/png", vec![1, 2, 3]),
        style_image: ImageSource::Remote("https://cdn.example.com/s.png".to_string()),
        style_name: "female color 1".to_string(),
        style_prompt: "platinum blonde".to_string(),
        provider: None,
    }
}

#[tokio::test]
async fn test_identity_model_failure_falls_back_to_text_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/InstantX/InstantID"))
        .and(header("authorization", "Bearer hf_test"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Model is loading"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/stabilityai/sdxl-refiner"))
        .and(body_partial_json(json!({
            "parameters": { "num_inference_steps": 30 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JPEG.to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let image = provider(&server).attempt(&request()).await.unwrap();
    assert_eq!(image.mime_type(), "image/jpeg");
    assert_eq!(image.bytes(), JPEG);
}

#[tokio::test]
async fn test_identity_model_receives_source_photo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/InstantX/InstantID"))
        .and(body_partial_json(json!({
            "inputs": { "image": "data:image/png;base64,AQID" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(JPEG.to_vec(), "image/jpeg"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(provider(&server).attempt(&request()).await.is_ok());
}

#[tokio::test]
async fn test_all_models_failing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = provider(&server).attempt(&request()).await.unwrap_err();
    assert!(err.to_string().contains("huggingface: all models failed"));
}
