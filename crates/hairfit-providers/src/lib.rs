//! # hairfit-providers
//!
//! Image-generation providers for hairfit.
//!
//! This crate provides:
//! - The `TransformProvider` strategy trait
//! - Gemini, Replicate and Hugging Face providers
//! - A demo provider that echoes the source photo
//! - `FallbackChain`, which tries providers in order
//! - Provider configuration from TOML or environment
//! - `HttpTransformClient` for calling a remote transform endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use hairfit_providers::{FallbackChain, ProvidersConfig};
//!
//! let config = ProvidersConfig::load().expect("provider config");
//! let chain = FallbackChain::from_config(&config, false).expect("provider chain");
//! println!("providers: {:?}", chain.provider_ids());
//! ```

pub mod chain;
pub mod client;
pub mod config;
pub mod demo;
pub mod gemini;
pub mod huggingface;
pub mod prompts;
pub mod provider;
pub mod replicate;

// Mock provider for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use chain::{FallbackChain, ProviderFailure};
pub use client::HttpTransformClient;
pub use config::{
    ConfigError, ConfigResult, GeminiConfig, HuggingFaceConfig, ProviderKind, ProvidersConfig,
    ReplicateConfig,
};
pub use demo::DemoProvider;
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use provider::TransformProvider;
pub use replicate::ReplicateProvider;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockProvider;
