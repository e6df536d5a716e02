//! HTTP transform client against a mock proxy.

use hairfit_core::{Error, ImageData, ImageSource, TransformRequest, TransformService};
use hairfit_providers::HttpTransformClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> TransformRequest {
    TransformRequest {
        source_image: ImageData::new("image/png", vec![1, 2, 3]),
        style_image: ImageSource::Remote("https://cdn.example.com/s.png".to_string()),
        style_name: "male cut 1".to_string(),
        style_prompt: "fade".to_string(),
        provider: None,
    }
}

#[tokio::test]
async fn test_client_parses_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transform"))
        .and(body_partial_json(json!({
            "sourceImage": "data:image/png;base64,AQID",
            "styleImage": "https://cdn.example.com/s.png",
            "styleName": "male cut 1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "image": "data:image/jpeg;base64,/9j/4A==",
            "provider": "gemini"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpTransformClient::new(format!("{}/transform", server.uri())).unwrap();
    let result = client.transform(request()).await.unwrap();

    assert_eq!(result.provider.as_deref(), Some("gemini"));
    assert_eq!(result.image.mime_type(), "image/jpeg");
    assert!(!result.demo);
}

#[tokio::test]
async fn test_client_surfaces_error_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({
            "success": false,
            "error": "all providers failed (gemini: quota)"
        })))
        .mount(&server)
        .await;

    let client = HttpTransformClient::new(format!("{}/transform", server.uri())).unwrap();
    let err = client.transform(request()).await.unwrap_err();

    match err {
        Error::Provider(message) => assert_eq!(message, "all providers failed (gemini: quota)"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_client_non_json_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(504).set_body_string("gateway timeout"))
        .mount(&server)
        .await;

    let client = HttpTransformClient::new(format!("{}/transform", server.uri())).unwrap();
    let err = client.transform(request()).await.unwrap_err();
    assert!(err.to_string().contains("504"));
}
