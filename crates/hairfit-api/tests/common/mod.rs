//! Shared helpers for router integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use hairfit_api::{build_router, AppState, ServerConfig};
use hairfit_core::{defaults, CatalogStore, ImageData, KeyValueStore, MemoryStore};
use hairfit_providers::{FallbackChain, TransformProvider};
use serde_json::Value;
use tower::ServiceExt;

/// Photo limit used by the tests.
pub const TEST_PHOTO_LIMIT: u64 = 1024;

pub fn test_config() -> ServerConfig {
    ServerConfig {
        max_photo_bytes: TEST_PHOTO_LIMIT,
        ..ServerConfig::default()
    }
}

pub async fn test_state(
    storage: Arc<dyn KeyValueStore>,
    providers: Vec<Arc<dyn TransformProvider>>,
    config: ServerConfig,
) -> AppState {
    let catalog = CatalogStore::open(storage, defaults::CATALOG_STORAGE_KEY).await;
    let chain = FallbackChain::new(providers).with_demo_fallback(config.demo_fallback);
    AppState::new(catalog, chain, config)
}

/// Router over an empty in-memory store and the given providers.
pub async fn build_test_app(providers: Vec<Arc<dyn TransformProvider>>) -> Router {
    let state = test_state(Arc::new(MemoryStore::new()), providers, test_config()).await;
    build_router(state)
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn send_json(app: Router, method: Method, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A data URL carrying `len` bytes.
pub fn data_url(len: usize) -> String {
    ImageData::new("image/png", vec![7; len]).to_data_url()
}
