//! Centralized default constants for hairfit.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Place new constants in the matching section.

// =============================================================================
// CATALOG
// =============================================================================

/// Key under which the catalog is persisted in the key-value store.
pub const CATALOG_STORAGE_KEY: &str = "hairfit.catalog";

/// Genders present in the built-in catalog.
pub const DEFAULT_GENDERS: &[&str] = &["male", "female"];

/// Categories created under every built-in gender.
pub const DEFAULT_CATEGORIES: &[&str] = &["cut", "perm", "color"];

/// Prefix of generated catalog style ids.
pub const STYLE_ID_PREFIX: &str = "style-";

/// Prefix of ad-hoc custom style ids.
pub const CUSTOM_STYLE_ID_PREFIX: &str = "custom-";

/// Display name of an ad-hoc custom style.
pub const CUSTOM_STYLE_NAME: &str = "Custom style";

/// Prompt used for a custom style when the user gives none.
pub const CUSTOM_STYLE_PROMPT: &str = "apply the exact hairstyle from the reference image";

// =============================================================================
// UPLOADS
// =============================================================================

/// Maximum accepted source photo size (10 MiB).
pub const MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

/// MIME type assumed when an image's type cannot be detected.
pub const FALLBACK_IMAGE_MIME: &str = "image/png";

// =============================================================================
// STORAGE
// =============================================================================

/// Default directory for the file-backed key-value store.
pub const CATALOG_DIR: &str = "./data";

/// Default storage quota in bytes (matches a typical browser local storage).
pub const STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

// =============================================================================
// TRANSFORM
// =============================================================================

/// Progress checkpoint: request prepared.
pub const PROGRESS_PREPARING: u8 = 10;

/// Progress checkpoint: request handed to the transform service.
pub const PROGRESS_SENT: u8 = 40;

/// Progress checkpoint: result received and being stored.
pub const PROGRESS_RECEIVED: u8 = 70;

/// Progress checkpoint: demo fallback substituted.
pub const PROGRESS_DEMO: u8 = 80;

/// Progress checkpoint: finished.
pub const PROGRESS_DONE: u8 = 100;

/// Capacity of the progress broadcast channel.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// PROVIDERS
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini models tried in order.
pub const GEMINI_MODELS: &[&str] = &[
    "gemini-2.0-flash-exp-image-generation",
    "gemini-2.0-flash-preview-image-generation",
];

/// Default Replicate API base URL.
pub const REPLICATE_URL: &str = "https://api.replicate.com/v1";

/// Interval between Replicate prediction polls (milliseconds).
pub const REPLICATE_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum Replicate prediction polls before giving up.
pub const REPLICATE_MAX_POLL_ATTEMPTS: u32 = 60;

/// Default Hugging Face inference API base URL.
pub const HUGGINGFACE_URL: &str = "https://api-inference.huggingface.co";

/// Hugging Face models tried in order.
pub const HUGGINGFACE_MODELS: &[&str] = &[
    "InstantX/InstantID",
    "stabilityai/stable-diffusion-xl-refiner-1.0",
];

/// Timeout for a single provider HTTP request (seconds).
pub const PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Timeout for a transform call from the controller to the proxy (seconds).
pub const TRANSFORM_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default HTTP bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Extra body allowance on top of the photo limit for base64 inflation and
/// the reference image.
pub const BODY_LIMIT_OVERHEAD_BYTES: usize = 8 * 1024 * 1024;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";
pub const ENV_CATALOG_DIR: &str = "CATALOG_DIR";
pub const ENV_CATALOG_QUOTA_BYTES: &str = "CATALOG_QUOTA_BYTES";
pub const ENV_MAX_PHOTO_BYTES: &str = "MAX_PHOTO_BYTES";
pub const ENV_DEMO_FALLBACK: &str = "DEMO_FALLBACK";
pub const ENV_ALLOW_INSECURE_STYLE_URLS: &str = "ALLOW_INSECURE_STYLE_URLS";
pub const ENV_PROVIDERS_CONFIG: &str = "HAIRFIT_PROVIDERS_CONFIG";
pub const ENV_TRANSFORM_CHAIN: &str = "TRANSFORM_CHAIN";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_MODELS: &str = "GEMINI_MODELS";
pub const ENV_REPLICATE_API_TOKEN: &str = "REPLICATE_API_TOKEN";
/// Older name for the Replicate token, read when the current one is unset.
pub const ENV_REPLICATE_API_KEY: &str = "REPLICATE_API_KEY";
pub const ENV_REPLICATE_BASE_URL: &str = "REPLICATE_BASE_URL";
pub const ENV_REPLICATE_VERSION: &str = "REPLICATE_MODEL_VERSION";
pub const ENV_HUGGINGFACE_API_KEY: &str = "HUGGINGFACE_API_KEY";
pub const ENV_HUGGINGFACE_BASE_URL: &str = "HUGGINGFACE_BASE_URL";
pub const ENV_HUGGINGFACE_MODELS: &str = "HUGGINGFACE_MODELS";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "PROVIDER_TIMEOUT_SECS";
