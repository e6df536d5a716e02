//! Scripted provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hairfit_core::{Error, ImageData, Result, TransformRequest};

use crate::provider::TransformProvider;

#[derive(Debug, Clone)]
enum Outcome {
    Succeed(ImageData),
    Fail(String),
    TooLarge { size: u64, limit: u64 },
}

/// Provider with a fixed outcome that counts its calls.
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    outcome: Outcome,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Succeeds with a small fixed PNG-tagged image.
    pub fn succeeding(id: impl Into<String>) -> Self {
        Self::returning(id, ImageData::new("image/png", b"mock-result".to_vec()))
    }

    pub fn returning(id: impl Into<String>, image: ImageData) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Succeed(image),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::Fail(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails as if a downloaded input exceeded `limit`.
    pub fn too_large(id: impl Into<String>, size: u64, limit: u64) -> Self {
        Self {
            id: id.into(),
            outcome: Outcome::TooLarge { size, limit },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn attempt(&self, _request: &TransformRequest) -> Result<ImageData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Succeed(image) => Ok(image.clone()),
            Outcome::Fail(message) => Err(Error::Provider(message.clone())),
            Outcome::TooLarge { size, limit } => Err(Error::PayloadTooLarge {
                size: *size,
                limit: *limit,
            }),
        }
    }
}
