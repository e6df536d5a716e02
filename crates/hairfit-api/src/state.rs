//! Shared application state.

use std::sync::Arc;

use hairfit_core::{defaults, CatalogStore, FileStore, KeyValueStore, Result, TransformService};
use hairfit_providers::{FallbackChain, ProvidersConfig};
use tracing::info;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub transformer: Arc<dyn TransformService>,
    /// Provider ids in fallback order, reported by the health check.
    pub provider_ids: Arc<Vec<String>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(catalog: CatalogStore, chain: FallbackChain, config: ServerConfig) -> Self {
        let provider_ids = chain.provider_ids();
        Self {
            catalog: Arc::new(catalog),
            transformer: Arc::new(chain),
            provider_ids: Arc::new(provider_ids),
            config: Arc::new(config),
        }
    }

    /// Open the file-backed catalog and build the provider chain.
    pub async fn from_config(config: ServerConfig, providers: &ProvidersConfig) -> Result<Self> {
        let mut store = FileStore::new(config.catalog_dir.clone());
        if let Some(quota) = config.catalog_quota_bytes {
            store = store.with_quota(quota);
        }
        let storage: Arc<dyn KeyValueStore> = Arc::new(store);
        let catalog = CatalogStore::open(storage, defaults::CATALOG_STORAGE_KEY).await;

        // Remote style images obey the same limits as uploaded photos.
        let mut providers = providers.clone();
        providers.gemini.style_image_max_bytes = config.max_photo_bytes;
        providers.gemini.allow_insecure_style_urls = config.allow_insecure_style_urls;

        let chain = FallbackChain::from_config(&providers, config.demo_fallback)?;
        info!(
            subsystem = "api",
            catalog_dir = %config.catalog_dir.display(),
            providers = ?chain.provider_ids(),
            demo_fallback = config.demo_fallback,
            "Application state ready"
        );
        Ok(Self::new(catalog, chain, config))
    }
}
