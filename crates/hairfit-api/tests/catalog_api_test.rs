//! Catalog admin endpoint tests.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, data_url, delete, get, send_json, test_config};
use hairfit_core::{defaults, load_catalog, KeyValueStore, MemoryStore};
use serde_json::json;

const STYLES: &str = "/api/v1/catalog/genders/female/categories/perm/styles";

#[tokio::test]
async fn test_empty_store_serves_builtin_catalog() {
    let app = build_test_app(Vec::new()).await;
    let response = get(app, "/api/v1/catalog").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let genders: Vec<&str> = json["genders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap())
        .collect();
    assert_eq!(genders, ["male", "female"]);
}

#[tokio::test]
async fn test_gender_lifecycle() {
    let app = build_test_app(Vec::new()).await;

    let response = send_json(
        app.clone(),
        Method::POST,
        "/api/v1/catalog/genders",
        json!({ "name": "  kids " }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["name"], "kids");

    let response = send_json(
        app.clone(),
        Method::POST,
        "/api/v1/catalog/genders",
        json!({ "name": "kids" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("kids"));

    let response = delete(app.clone(), "/api/v1/catalog/genders/kids").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(app, "/api/v1/catalog/genders/kids").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_requires_gender() {
    let app = build_test_app(Vec::new()).await;
    let response = send_json(
        app.clone(),
        Method::POST,
        "/api/v1/catalog/genders/robot/categories",
        json!({ "name": "cut" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/catalog/genders/male/categories",
        json!({ "name": "braids" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_style_add_update_remove() {
    let app = build_test_app(Vec::new()).await;

    let mut ids = Vec::new();
    for prompt in [Some("loose waves"), None, Some("tight curls")] {
        let mut body = json!({ "image": data_url(4) });
        if let Some(p) = prompt {
            body["prompt"] = json!(p);
        }
        let response = send_json(app.clone(), Method::POST, STYLES, body).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let style = body_json(response).await;
        ids.push(style["id"].as_str().unwrap().to_string());
    }

    let styles = body_json(get(app.clone(), STYLES).await).await;
    assert_eq!(styles[1]["name"], "female perm 2");
    assert_eq!(styles[1]["prompt"], "female perm 2 hairstyle, perm style");

    // Move the last style to the front; names follow positions.
    let response = send_json(
        app.clone(),
        Method::PATCH,
        &format!("{}/{}", STYLES, ids[2]),
        json!({ "position": 0, "prompt": "very tight curls" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved = body_json(response).await;
    assert_eq!(moved["name"], "female perm 1");
    assert_eq!(moved["prompt"], "very tight curls");

    let response = delete(app.clone(), &format!("{}/{}", STYLES, ids[0])).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let styles = body_json(get(app.clone(), STYLES).await).await;
    let names: Vec<&str> = styles
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["female perm 1", "female perm 2"]);

    let lookup = body_json(get(app, &format!("/api/v1/catalog/styles/{}", ids[1])).await).await;
    assert_eq!(lookup["gender"], "female");
    assert_eq!(lookup["category"], "perm");
    assert_eq!(lookup["style"]["name"], "female perm 2");
}

#[tokio::test]
async fn test_style_validation() {
    let app = build_test_app(Vec::new()).await;

    let response = send_json(
        app.clone(),
        Method::POST,
        STYLES,
        json!({ "image": "ftp://example.com/a.png" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(
        app.clone(),
        Method::POST,
        STYLES,
        json!({ "image": "https://10.0.0.5/a.png" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_json(
        app.clone(),
        Method::POST,
        STYLES,
        json!({ "image": data_url(common::TEST_PHOTO_LIMIT as usize + 1) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = send_json(
        app.clone(),
        Method::PATCH,
        &format!("{}/style-missing", STYLES),
        json!({ "prompt": "x" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_json(
        app.clone(),
        Method::PATCH,
        &format!("{}/style-missing", STYLES),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(app, "/api/v1/catalog/styles/style-missing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mutations_are_persisted() {
    let storage = Arc::new(MemoryStore::new());
    let state = common::test_state(storage.clone(), Vec::new(), test_config()).await;
    let app = hairfit_api::build_router(state);

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/catalog/genders",
        json!({ "name": "kids" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stored = load_catalog(storage.as_ref(), defaults::CATALOG_STORAGE_KEY).await;
    assert!(stored.gender("kids").is_some());
}

#[tokio::test]
async fn test_quota_exceeded_leaves_catalog_unchanged() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_quota(512));
    let state = common::test_state(storage, Vec::new(), test_config()).await;
    let app = hairfit_api::build_router(state);

    let response = send_json(
        app.clone(),
        Method::POST,
        STYLES,
        json!({ "image": data_url(600) }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);

    let styles = body_json(get(app, STYLES).await).await;
    assert_eq!(styles, json!([]));
}
