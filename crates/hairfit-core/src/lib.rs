//! # hairfit-core
//!
//! Core types for the hairfit try-on service: the style catalog and its edit
//! sessions, catalog persistence, image payloads, transform wire types, and
//! the selection/transform controller.

pub mod catalog;
pub mod controller;
pub mod defaults;
pub mod edit;
pub mod error;
pub mod image;
pub mod logging;
pub mod storage;
pub mod transform;

// Re-export commonly used types at crate root
pub use catalog::{
    default_prompt, parse_catalog, style_name, Catalog, Category, Gender, Style, StyleId,
    StyleMembership,
};
pub use controller::{
    Controller, ControllerConfig, ControllerSnapshot, ControllerState, Progress, ProgressStage,
    SelectedStyle, DEMO_PROVIDER_ID,
};
pub use edit::EditSession;
pub use error::{Error, Result};
pub use image::{check_remote_url, detect_image_mime, read_image_file, ImageData, ImageSource};
pub use storage::{load_catalog, save_catalog, CatalogStore, FileStore, KeyValueStore, MemoryStore};
pub use transform::{TransformRequest, TransformResponse, TransformResult, TransformService};
