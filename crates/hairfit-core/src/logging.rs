//! Structured logging field names shared by every hairfit crate.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (poll responses) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "catalog", "controller", "providers"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "file_store", "edit_session", "chain", "gemini"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "load", "save", "commit", "transform", "attempt", "poll"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Gender label.
pub const GENDER: &str = "gender";

/// Category label.
pub const CATEGORY: &str = "category";

/// Style id.
pub const STYLE_ID: &str = "style_id";

/// Storage key.
pub const STORAGE_KEY: &str = "storage_key";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Size of an image or serialized payload in bytes.
pub const BYTES: &str = "bytes";

/// Number of styles in a catalog or category.
pub const STYLE_COUNT: &str = "style_count";

/// Poll attempt number.
pub const ATTEMPT: &str = "attempt";

/// Progress percentage.
pub const PROGRESS: &str = "progress";

// ─── Provider fields ───────────────────────────────────────────────────────

/// Provider identifier ("gemini", "replicate", "huggingface", "demo").
pub const PROVIDER: &str = "provider";

/// Model name used by a provider.
pub const MODEL: &str = "model";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Whether a demo result was substituted.
pub const DEMO: &str = "demo";
