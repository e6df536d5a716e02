//! # hairfit-api
//!
//! HTTP surface of hairfit: the transform proxy in front of the provider
//! chain, catalog admin endpoints, and a health check.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::{AllowedOrigins, ServerConfig};
pub use error::{ApiError, TransformError};
pub use router::{build_cors_layer, build_router};
pub use state::AppState;
