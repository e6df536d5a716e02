//! Controller transform lifecycle with scripted transform services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hairfit_core::{
    Catalog, Controller, ControllerConfig, ControllerState, EditSession, Error, ImageData,
    ImageSource, ProgressStage, Result, SelectedStyle, TransformRequest, TransformResult,
    TransformService,
};
use tokio::sync::Notify;

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

/// Service that returns a fixed outcome and counts calls, optionally blocking
/// until released.
struct Scripted {
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
    fail_with: Option<fn() -> Error>,
}

impl Scripted {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: None,
            fail_with: None,
        }
    }

    fn failing(f: fn() -> Error) -> Self {
        Self {
            fail_with: Some(f),
            ..Self::ok()
        }
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok()
        }
    }
}

#[async_trait]
impl TransformService for Scripted {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(f) = self.fail_with {
            return Err(f());
        }
        assert_eq!(request.style_prompt, "buzz cut");
        Ok(TransformResult {
            image: ImageData::new("image/png", b"generated".to_vec()),
            provider: Some("gemini".to_string()),
            demo: false,
        })
    }
}

fn ready(service: Arc<Scripted>, demo_fallback: bool) -> Controller {
    let controller = Controller::new(
        service,
        ControllerConfig {
            demo_fallback,
            ..Default::default()
        },
    );
    controller.set_photo(PNG.to_vec()).unwrap();
    controller
        .set_style(SelectedStyle::custom(
            ImageSource::Remote("https://cdn.example.com/s.png".into()),
            Some("buzz cut".into()),
        ))
        .unwrap();
    assert_eq!(controller.state(), ControllerState::Ready);
    controller
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<hairfit_core::Progress>) -> Vec<u8> {
    let mut seen = Vec::new();
    while let Ok(p) = rx.try_recv() {
        seen.push(p.percent);
    }
    seen
}

#[tokio::test]
async fn test_success_reports_monotonic_progress_to_100() {
    let service = Arc::new(Scripted::ok());
    let controller = ready(service.clone(), false);
    let mut rx = controller.subscribe();

    let result = controller.transform().await.unwrap();
    assert_eq!(result.image.bytes(), b"generated");
    assert!(!result.demo);
    assert_eq!(controller.state(), ControllerState::Completed);

    let seen = drain(&mut rx);
    assert_eq!(seen, [10, 40, 70, 100]);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_failure_surfaces_message_and_never_reaches_100() {
    let service = Arc::new(Scripted::failing(|| {
        Error::Provider("all providers failed: gemini: 429".into())
    }));
    let controller = ready(service, false);
    let mut rx = controller.subscribe();

    let err = controller.transform().await.unwrap_err();
    assert!(matches!(err, Error::Provider(_)));
    assert_eq!(controller.state(), ControllerState::Failed);
    assert_eq!(
        controller.last_error().as_deref(),
        Some("all providers failed: gemini: 429")
    );
    assert!(!drain(&mut rx).contains(&100));

    assert_eq!(controller.retry().unwrap(), ControllerState::Ready);
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn test_demo_fallback_echoes_source_photo() {
    let service = Arc::new(Scripted::failing(|| Error::Request("connection refused".into())));
    let controller = ready(service, true);
    let mut rx = controller.subscribe();

    let result = controller.transform().await.unwrap();
    assert!(result.demo);
    assert_eq!(result.image.bytes(), PNG);
    assert_eq!(controller.state(), ControllerState::Completed);
    assert_eq!(drain(&mut rx), [10, 40, 80, 100]);
}

#[tokio::test]
async fn test_demo_fallback_does_not_mask_input_errors() {
    let service = Arc::new(Scripted::failing(|| Error::InvalidInput("bad style image".into())));
    let controller = ready(service, true);
    assert!(matches!(
        controller.transform().await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(controller.state(), ControllerState::Failed);
}

#[tokio::test]
async fn test_second_transform_while_in_flight_is_rejected() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(Scripted::gated(gate.clone()));
    let controller = Arc::new(ready(service.clone(), false));
    let mut rx = controller.subscribe();

    let running = tokio::spawn({
        let controller = controller.clone();
        async move { controller.transform().await }
    });

    // Wait until the request has been handed to the service.
    loop {
        let progress = rx.recv().await.unwrap();
        if progress.stage == ProgressStage::Sending {
            break;
        }
    }
    assert_eq!(controller.state(), ControllerState::InFlight);

    assert!(matches!(
        controller.transform().await,
        Err(Error::AlreadyProcessing)
    ));
    assert!(matches!(
        controller.set_photo(PNG.to_vec()),
        Err(Error::AlreadyProcessing)
    ));
    assert!(matches!(controller.clear_style(), Err(Error::AlreadyProcessing)));

    gate.notify_one();
    running.await.unwrap().unwrap();
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), ControllerState::Completed);
}

#[tokio::test]
async fn test_dropped_transform_releases_in_flight() {
    let gate = Arc::new(Notify::new());
    let service = Arc::new(Scripted::gated(gate));
    let controller = ready(service, false);

    let outcome =
        tokio::time::timeout(std::time::Duration::from_millis(20), controller.transform()).await;
    assert!(outcome.is_err());
    assert_eq!(controller.state(), ControllerState::Ready);
}

#[tokio::test]
async fn test_catalog_style_selection_drives_request() {
    let mut session = EditSession::begin(&Catalog::builtin());
    let style = session
        .add_style(
            "male",
            "cut",
            ImageSource::Inline(ImageData::new("image/png", PNG.to_vec())),
            Some("buzz cut".into()),
        )
        .unwrap();
    let catalog = session.commit();

    let controller = Controller::new(Arc::new(Scripted::ok()), ControllerConfig::default());
    controller.select_gender(&catalog, "male").unwrap();
    let listed = controller.selectable_styles(&catalog);
    assert_eq!(listed.len(), 1);

    controller.select_style(&catalog, &style.id).unwrap();
    controller.set_photo(PNG.to_vec()).unwrap();
    let selected = controller.snapshot().style.unwrap();
    assert_eq!(selected.membership.unwrap().category, "cut");

    controller.transform().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Completed);
}

#[tokio::test]
async fn test_load_photo_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("me.png");
    std::fs::write(&path, PNG).unwrap();

    let controller = Controller::new(
        Arc::new(Scripted::ok()),
        ControllerConfig {
            max_photo_bytes: PNG.len() as u64,
            ..Default::default()
        },
    );
    controller.load_photo(&path).await.unwrap();
    assert_eq!(controller.snapshot().photo.unwrap().mime_type(), "image/png");

    std::fs::write(&path, [PNG, &b"x"[..]].concat()).unwrap();
    assert!(matches!(
        controller.load_photo(&path).await,
        Err(Error::PayloadTooLarge { .. })
    ));
    assert_eq!(controller.snapshot().photo.unwrap().len(), PNG.len());
}
