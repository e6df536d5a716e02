//! Selection and transform controller.
//!
//! Tracks what the user wants to transform (photo, style, active catalog
//! partition) and drives at most one transform request at a time.
//!
//! ```text
//! Idle ──photo+style──▶ Ready ──transform──▶ InFlight ──ok──▶ Completed
//!                         ▲                      └──err──▶ Failed
//!                         └──────────── retry ─────────────────┘
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Style, StyleId, StyleMembership};
use crate::defaults;
use crate::error::{Error, Result};
use crate::image::{self, ImageData, ImageSource};
use crate::transform::{TransformRequest, TransformResult, TransformService};

/// Provider id reported for locally substituted demo results.
pub const DEMO_PROVIDER_ID: &str = "demo";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Ready,
    InFlight,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Preparing,
    Sending,
    Receiving,
    Demo,
    Done,
}

impl ProgressStage {
    pub fn percent(self) -> u8 {
        match self {
            ProgressStage::Preparing => defaults::PROGRESS_PREPARING,
            ProgressStage::Sending => defaults::PROGRESS_SENT,
            ProgressStage::Receiving => defaults::PROGRESS_RECEIVED,
            ProgressStage::Demo => defaults::PROGRESS_DEMO,
            ProgressStage::Done => defaults::PROGRESS_DONE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgressStage::Preparing => "Preparing images",
            ProgressStage::Sending => "Generating hairstyle",
            ProgressStage::Receiving => "Receiving result",
            ProgressStage::Demo => "Showing demo result",
            ProgressStage::Done => "Done",
        }
    }
}

/// One progress checkpoint of a transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub percent: u8,
    pub stage: ProgressStage,
    pub label: String,
}

impl From<ProgressStage> for Progress {
    fn from(stage: ProgressStage) -> Self {
        Self {
            percent: stage.percent(),
            stage,
            label: stage.label().to_string(),
        }
    }
}

/// The selected style: a catalog entry or an ad-hoc custom style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedStyle {
    pub style: Style,
    /// `None` for custom styles.
    pub membership: Option<StyleMembership>,
}

impl SelectedStyle {
    pub fn catalog(style: Style, membership: StyleMembership) -> Self {
        Self {
            style,
            membership: Some(membership),
        }
    }

    /// A style that exists only for this selection.
    pub fn custom(image: ImageSource, prompt: Option<String>) -> Self {
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| defaults::CUSTOM_STYLE_PROMPT.to_string());
        Self {
            style: Style {
                id: StyleId::generate_custom(),
                name: defaults::CUSTOM_STYLE_NAME.to_string(),
                image,
                prompt,
            },
            membership: None,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.membership.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Largest accepted source photo in bytes.
    pub max_photo_bytes: u64,
    /// Echo the source photo as a demo result when the service is unreachable.
    pub demo_fallback: bool,
    pub progress_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_photo_bytes: defaults::MAX_PHOTO_BYTES,
            demo_fallback: false,
            progress_capacity: defaults::PROGRESS_CHANNEL_CAPACITY,
        }
    }
}

/// Read-only view of the controller.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub style: Option<SelectedStyle>,
    pub photo: Option<ImageData>,
    pub result: Option<TransformResult>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Selection {
    gender: Option<String>,
    category: Option<String>,
    style: Option<SelectedStyle>,
    photo: Option<ImageData>,
    result: Option<TransformResult>,
    error: Option<String>,
    in_flight: bool,
}

impl Selection {
    fn state(&self) -> ControllerState {
        if self.in_flight {
            ControllerState::InFlight
        } else if self.result.is_some() {
            ControllerState::Completed
        } else if self.error.is_some() {
            ControllerState::Failed
        } else if self.photo.is_some() && self.style.is_some() {
            ControllerState::Ready
        } else {
            ControllerState::Idle
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.in_flight {
            Err(Error::AlreadyProcessing)
        } else {
            Ok(())
        }
    }

    fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
    }
}

/// Clears the in-flight flag if a transform future is dropped mid-request.
struct InFlightReset<'a> {
    inner: &'a Mutex<Selection>,
    armed: bool,
}

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.inner).in_flight = false;
        }
    }
}

fn lock(inner: &Mutex<Selection>) -> MutexGuard<'_, Selection> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct Controller {
    service: Arc<dyn TransformService>,
    config: ControllerConfig,
    inner: Mutex<Selection>,
    progress: broadcast::Sender<Progress>,
}

impl Controller {
    pub fn new(service: Arc<dyn TransformService>, config: ControllerConfig) -> Self {
        let (progress, _) = broadcast::channel(config.progress_capacity.max(1));
        Self {
            service,
            config,
            inner: Mutex::new(Selection::default()),
            progress,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Receive progress checkpoints of subsequent transforms.
    pub fn subscribe(&self) -> broadcast::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        lock(&self.inner).state()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let inner = lock(&self.inner);
        ControllerSnapshot {
            state: inner.state(),
            gender: inner.gender.clone(),
            category: inner.category.clone(),
            style: inner.style.clone(),
            photo: inner.photo.clone(),
            result: inner.result.clone(),
            error: inner.error.clone(),
        }
    }

    pub fn result(&self) -> Option<TransformResult> {
        lock(&self.inner).result.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner).error.clone()
    }

    // ─── Photo ───────────────────────────────────────────────────────────────

    /// Set the source photo from raw bytes.
    ///
    /// Oversized or non-image payloads are rejected without touching any
    /// state. Accepting a photo clears the previous outcome.
    pub fn set_photo(&self, bytes: Vec<u8>) -> Result<()> {
        let size = bytes.len() as u64;
        if size > self.config.max_photo_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.config.max_photo_bytes,
            });
        }
        let photo = ImageData::from_bytes(bytes)?;
        self.set_photo_image(photo)
    }

    /// Set an already decoded source photo.
    pub fn set_photo_image(&self, photo: ImageData) -> Result<()> {
        let size = photo.len() as u64;
        if size > self.config.max_photo_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.config.max_photo_bytes,
            });
        }
        let mut inner = lock(&self.inner);
        inner.ensure_idle()?;
        debug!(
            subsystem = "controller",
            op = "set_photo",
            bytes = size,
            "Source photo set"
        );
        inner.photo = Some(photo);
        inner.clear_outcome();
        Ok(())
    }

    /// Read a photo from disk and select it.
    ///
    /// Dropping the returned future before it completes leaves the controller
    /// exactly as it was.
    pub async fn load_photo(&self, path: &Path) -> Result<()> {
        let photo = image::read_image_file(path, self.config.max_photo_bytes).await?;
        self.set_photo_image(photo)
    }

    pub fn clear_photo(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.ensure_idle()?;
        inner.photo = None;
        inner.clear_outcome();
        Ok(())
    }

    // ─── Style ───────────────────────────────────────────────────────────────

    /// Select a style, replacing any previous one.
    pub fn set_style(&self, style: SelectedStyle) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.ensure_idle()?;
        debug!(
            subsystem = "controller",
            op = "set_style",
            style_id = %style.style.id,
            custom = style.is_custom(),
            "Style selected"
        );
        inner.style = Some(style);
        inner.clear_outcome();
        Ok(())
    }

    /// Select a catalog style by id.
    pub fn select_style(&self, catalog: &Catalog, id: &StyleId) -> Result<()> {
        let (style, membership) = catalog
            .find_style(id)
            .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))?;
        self.set_style(SelectedStyle::catalog(style.clone(), membership))
    }

    pub fn clear_style(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.ensure_idle()?;
        inner.style = None;
        inner.clear_outcome();
        Ok(())
    }

    // ─── Catalog navigation ─────────────────────────────────────────────────

    /// Make `gender` active and fall through to its first category.
    pub fn select_gender(&self, catalog: &Catalog, gender: &str) -> Result<()> {
        let first_category = catalog
            .categories(gender)?
            .first()
            .map(|c| c.name.clone());
        let mut inner = lock(&self.inner);
        inner.gender = Some(gender.to_string());
        inner.category = first_category;
        Ok(())
    }

    pub fn select_category(&self, catalog: &Catalog, category: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        let gender = inner
            .gender
            .clone()
            .ok_or_else(|| Error::InvalidState("no gender is active".to_string()))?;
        catalog.category(&gender, category)?;
        inner.category = Some(category.to_string());
        Ok(())
    }

    /// Styles under the active gender and category.
    ///
    /// Empty when nothing is active or the active pair no longer exists.
    pub fn selectable_styles(&self, catalog: &Catalog) -> Vec<Style> {
        let inner = lock(&self.inner);
        match (&inner.gender, &inner.category) {
            (Some(gender), Some(category)) => catalog
                .styles(gender, category)
                .map(|styles| styles.to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    // ─── Transform ───────────────────────────────────────────────────────────

    /// Move `Completed` or `Failed` back to `Ready`, keeping photo and style.
    pub fn retry(&self) -> Result<ControllerState> {
        let mut inner = lock(&self.inner);
        match inner.state() {
            ControllerState::Completed | ControllerState::Failed => {
                inner.clear_outcome();
                Ok(inner.state())
            }
            ControllerState::InFlight => Err(Error::AlreadyProcessing),
            other => Err(Error::InvalidState(format!(
                "nothing to retry in state {:?}",
                other
            ))),
        }
    }

    /// Run one transform of the selected photo with the selected style.
    ///
    /// Only allowed from `Ready`. A second call while a request is in flight
    /// fails immediately with `AlreadyProcessing`.
    pub async fn transform(&self) -> Result<TransformResult> {
        let request = {
            let mut inner = lock(&self.inner);
            match inner.state() {
                ControllerState::Ready => {}
                ControllerState::InFlight => return Err(Error::AlreadyProcessing),
                other => {
                    return Err(Error::InvalidState(format!(
                        "transform requires a photo and a style (state {:?})",
                        other
                    )))
                }
            }
            let (Some(photo), Some(selected)) = (inner.photo.clone(), inner.style.clone()) else {
                return Err(Error::InvalidState("photo or style missing".to_string()));
            };
            inner.in_flight = true;
            TransformRequest {
                source_image: photo,
                style_image: selected.style.image,
                style_name: selected.style.name,
                style_prompt: selected.style.prompt,
                provider: None,
            }
        };
        let mut reset = InFlightReset {
            inner: &self.inner,
            armed: true,
        };

        let start = Instant::now();
        self.emit(ProgressStage::Preparing);
        let photo = request.source_image.clone();
        self.emit(ProgressStage::Sending);

        let outcome = self.service.transform(request).await;

        let mut inner = lock(&self.inner);
        inner.in_flight = false;
        reset.armed = false;

        match outcome {
            Ok(result) => {
                self.emit(ProgressStage::Receiving);
                inner.result = Some(result.clone());
                inner.error = None;
                drop(inner);
                self.emit(ProgressStage::Done);
                info!(
                    subsystem = "controller",
                    op = "transform",
                    provider = result.provider.as_deref().unwrap_or("unknown"),
                    demo = result.demo,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Transform completed"
                );
                Ok(result)
            }
            Err(e) if self.config.demo_fallback && e.is_upstream() => {
                warn!(
                    subsystem = "controller",
                    op = "transform",
                    error = %e,
                    "Transform service unavailable, using demo result"
                );
                self.emit(ProgressStage::Demo);
                let result = TransformResult {
                    image: photo,
                    provider: Some(DEMO_PROVIDER_ID.to_string()),
                    demo: true,
                };
                inner.result = Some(result.clone());
                inner.error = None;
                drop(inner);
                self.emit(ProgressStage::Done);
                Ok(result)
            }
            Err(e) => {
                warn!(
                    subsystem = "controller",
                    op = "transform",
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Transform failed"
                );
                inner.error = Some(user_message(&e));
                Err(e)
            }
        }
    }

    fn emit(&self, stage: ProgressStage) {
        debug!(
            subsystem = "controller",
            op = "progress",
            progress = stage.percent(),
            "Transform progress"
        );
        // No subscribers is fine.
        let _ = self.progress.send(stage.into());
    }
}

/// The message shown to the user for a failed transform.
fn user_message(error: &Error) -> String {
    match error {
        Error::Provider(msg) | Error::Timeout(msg) | Error::Request(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::test_images::png;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl TransformService for Echo {
        async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
            Ok(TransformResult {
                image: request.source_image,
                provider: Some("echo".to_string()),
                demo: false,
            })
        }
    }

    fn controller(max: u64) -> Controller {
        Controller::new(
            Arc::new(Echo),
            ControllerConfig {
                max_photo_bytes: max,
                ..Default::default()
            },
        )
    }

    fn custom() -> SelectedStyle {
        SelectedStyle::custom(
            ImageSource::Remote("https://cdn.example.com/s.png".to_string()),
            None,
        )
    }

    #[test]
    fn test_custom_style_defaults() {
        let style = custom();
        assert!(style.is_custom());
        assert!(style.style.id.as_str().starts_with("custom-"));
        assert_eq!(style.style.name, "Custom style");
        assert_eq!(style.style.prompt, defaults::CUSTOM_STYLE_PROMPT);
    }

    #[test]
    fn test_ready_requires_photo_and_style() {
        let c = controller(1024);
        assert_eq!(c.state(), ControllerState::Idle);
        c.set_photo(png(64)).unwrap();
        assert_eq!(c.state(), ControllerState::Idle);
        c.set_style(custom()).unwrap();
        assert_eq!(c.state(), ControllerState::Ready);
        c.clear_photo().unwrap();
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[test]
    fn test_oversized_photo_leaves_previous_photo() {
        let c = controller(100);
        c.set_photo(png(100)).unwrap();
        let err = c.set_photo(png(101)).unwrap_err();
        assert!(matches!(
            err,
            Error::PayloadTooLarge {
                size: 101,
                limit: 100
            }
        ));
        assert_eq!(c.snapshot().photo.unwrap().len(), 100);
    }

    #[test]
    fn test_non_image_photo_rejected() {
        let c = controller(1024);
        assert!(matches!(
            c.set_photo(b"%PDF-1.4 not an image".to_vec()),
            Err(Error::InvalidInput(_))
        ));
        assert!(c.snapshot().photo.is_none());
    }

    #[test]
    fn test_select_gender_falls_through_to_first_category() {
        let c = controller(1024);
        let catalog = Catalog::builtin();
        c.select_gender(&catalog, "female").unwrap();
        let snapshot = c.snapshot();
        assert_eq!(snapshot.gender.as_deref(), Some("female"));
        assert_eq!(snapshot.category.as_deref(), Some("cut"));
        assert!(matches!(
            c.select_gender(&catalog, "robot"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_select_category_requires_gender() {
        let c = controller(1024);
        assert!(matches!(
            c.select_category(&Catalog::builtin(), "cut"),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_empty_catalog_has_nothing_selectable() {
        let c = controller(1024);
        let catalog = Catalog::empty();
        assert!(c.select_gender(&catalog, "male").is_err());
        assert!(c.selectable_styles(&catalog).is_empty());
    }

    #[test]
    fn test_retry_only_after_outcome() {
        let c = controller(1024);
        assert!(matches!(c.retry(), Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_transform_from_idle_is_rejected() {
        let c = controller(1024);
        assert!(matches!(
            c.transform().await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_transform_success_then_retry() {
        let c = controller(1024);
        c.set_photo(png(32)).unwrap();
        c.set_style(custom()).unwrap();

        let result = c.transform().await.unwrap();
        assert_eq!(result.provider.as_deref(), Some("echo"));
        assert_eq!(c.state(), ControllerState::Completed);

        // Completed must be retried before transforming again.
        assert!(matches!(
            c.transform().await,
            Err(Error::InvalidState(_))
        ));
        assert_eq!(c.retry().unwrap(), ControllerState::Ready);
        assert!(c.snapshot().photo.is_some());
        assert!(c.snapshot().style.is_some());
    }
}
