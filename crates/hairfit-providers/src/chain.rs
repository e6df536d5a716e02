//! Ordered provider fallback.
//!
//! Providers are tried in order and the first success wins. When every real
//! provider fails the chain either returns a demo result (echo of the source
//! photo, flagged `demo`) or an error naming each failure.
//!
//! An oversized input ends the run at once. Neither the remaining providers
//! nor the demo are tried.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use hairfit_core::{Error, Result, TransformRequest, TransformResult, TransformService};
use tracing::{debug, info, warn};

use crate::config::{ProviderKind, ProvidersConfig};
use crate::demo::DemoProvider;
use crate::gemini::GeminiProvider;
use crate::huggingface::HuggingFaceProvider;
use crate::provider::TransformProvider;
use crate::replicate::ReplicateProvider;

/// One provider's failure within a chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

pub struct FallbackChain {
    providers: Vec<Arc<dyn TransformProvider>>,
    demo: Option<Arc<dyn TransformProvider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn TransformProvider>>) -> Self {
        Self {
            providers,
            demo: None,
        }
    }

    /// Append the demo provider as the last resort.
    pub fn with_demo_fallback(mut self, enabled: bool) -> Self {
        self.demo = enabled.then(|| Arc::new(DemoProvider) as Arc<dyn TransformProvider>);
        self
    }

    /// Build the chain described by `config`, skipping providers without
    /// credentials.
    pub fn from_config(config: &ProvidersConfig, demo_fallback: bool) -> Result<Self> {
        let mut providers: Vec<Arc<dyn TransformProvider>> = Vec::new();
        for kind in &config.chain {
            let provider: Option<Arc<dyn TransformProvider>> = match kind {
                ProviderKind::Gemini if config.gemini.has_credentials() => Some(Arc::new(
                    GeminiProvider::new(&config.gemini, config.timeout_secs)?,
                )),
                ProviderKind::Replicate if config.replicate.has_credentials() => Some(Arc::new(
                    ReplicateProvider::new(&config.replicate, config.timeout_secs)?,
                )),
                ProviderKind::HuggingFace if config.huggingface.has_credentials() => Some(
                    Arc::new(HuggingFaceProvider::new(
                        &config.huggingface,
                        config.timeout_secs,
                    )?),
                ),
                _ => None,
            };
            match provider {
                Some(p) => providers.push(p),
                None => debug!(
                    subsystem = "providers",
                    component = "chain",
                    provider = %kind,
                    "No credentials, provider skipped"
                ),
            }
        }
        Ok(Self::new(providers).with_demo_fallback(demo_fallback))
    }

    /// Provider ids in order, including the demo fallback when enabled.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers
            .iter()
            .chain(self.demo.iter())
            .map(|p| p.id().to_string())
            .collect()
    }

    pub fn has_demo_fallback(&self) -> bool {
        self.demo.is_some()
    }

    /// Providers in try order, with `preferred` moved to the front.
    fn ordered(&self, preferred: Option<&str>) -> Vec<Arc<dyn TransformProvider>> {
        let mut ordered = self.providers.clone();
        if let Some(name) = preferred {
            match ordered.iter().position(|p| p.id().eq_ignore_ascii_case(name)) {
                Some(index) => {
                    let provider = ordered.remove(index);
                    ordered.insert(0, provider);
                }
                None => debug!(
                    subsystem = "providers",
                    component = "chain",
                    provider = %name,
                    "Preferred provider not in chain, ignoring"
                ),
            }
        }
        ordered
    }

    /// Run the chain for one request.
    pub async fn run(&self, request: &TransformRequest) -> Result<TransformResult> {
        let start = Instant::now();
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for provider in self.ordered(request.provider.as_deref()) {
            match provider.attempt(request).await {
                Ok(image) => {
                    info!(
                        subsystem = "providers",
                        component = "chain",
                        op = "transform",
                        provider = provider.id(),
                        bytes = image.len(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Transform succeeded"
                    );
                    return Ok(TransformResult {
                        image,
                        provider: Some(provider.id().to_string()),
                        demo: provider.is_demo(),
                    });
                }
                Err(e @ Error::PayloadTooLarge { .. }) => {
                    warn!(
                        subsystem = "providers",
                        component = "chain",
                        provider = provider.id(),
                        error = %e,
                        "Request input too large, stopping"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        subsystem = "providers",
                        component = "chain",
                        provider = provider.id(),
                        error = %e,
                        "Provider failed, falling back"
                    );
                    failures.push(ProviderFailure {
                        provider: provider.id().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(demo) = &self.demo {
            warn!(
                subsystem = "providers",
                component = "chain",
                provider = demo.id(),
                failed = failures.len(),
                "All providers failed, returning demo result"
            );
            let image = demo.attempt(request).await?;
            return Ok(TransformResult {
                image,
                provider: Some(demo.id().to_string()),
                demo: true,
            });
        }

        Err(exhausted(&failures))
    }
}

fn exhausted(failures: &[ProviderFailure]) -> Error {
    if failures.is_empty() {
        return Error::Provider("no transform providers are configured".to_string());
    }
    let detail = failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ");
    Error::Provider(format!("all providers failed ({})", detail))
}

#[async_trait]
impl TransformService for FallbackChain {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        self.run(&request).await
    }
}
