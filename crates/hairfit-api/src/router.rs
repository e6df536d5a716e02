//! Application router and middleware stack.
//!
//! Shared by the binary and the integration tests.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{AllowedOrigins, ServerConfig};
use crate::handlers::{catalog, health, transform};
use crate::state::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/transform", post(transform::transform))
        .route("/api/v1/transform", post(transform::transform))
        .route("/api/v1/catalog", get(catalog::get_catalog))
        .route("/api/v1/catalog/genders", post(catalog::add_gender))
        .route(
            "/api/v1/catalog/genders/:gender",
            delete(catalog::remove_gender),
        )
        .route(
            "/api/v1/catalog/genders/:gender/categories",
            post(catalog::add_category),
        )
        .route(
            "/api/v1/catalog/genders/:gender/categories/:category",
            delete(catalog::remove_category),
        )
        .route(
            "/api/v1/catalog/genders/:gender/categories/:category/styles",
            get(catalog::list_styles).post(catalog::add_style),
        )
        .route(
            "/api/v1/catalog/genders/:gender/categories/:category/styles/:id",
            patch(catalog::update_style).delete(catalog::remove_style),
        )
        .route("/api/v1/catalog/styles/:id", get(catalog::get_style))
        // Middleware
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        // Photos arrive base64-encoded, so the default extractor limit is
        // replaced by one derived from the photo limit.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .with_state(state)
}

pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().max_age(Duration::from_secs(3600));
    match &config.allowed_origins {
        AllowedOrigins::Any => layer
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        AllowedOrigins::List(origins) => layer
            .allow_origin(AllowOrigin::list(parse_origins(origins)))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([CONTENT_TYPE, ACCEPT, AUTHORIZATION]),
    }
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect()
}
