//! Placeholder provider that echoes the source photo.

use async_trait::async_trait;
use hairfit_core::{ImageData, Result, TransformRequest, DEMO_PROVIDER_ID};

use crate::provider::TransformProvider;

/// Always succeeds by returning the source photo unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoProvider;

#[async_trait]
impl TransformProvider for DemoProvider {
    fn id(&self) -> &str {
        DEMO_PROVIDER_ID
    }

    fn is_demo(&self) -> bool {
        true
    }

    async fn attempt(&self, request: &TransformRequest) -> Result<ImageData> {
        Ok(request.source_image.clone())
    }
}
