//! Server configuration loaded from environment variables.

use std::path::PathBuf;

use hairfit_core::{defaults, Error, Result};

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `ALLOWED_ORIGINS=*`
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
    /// Directory of the file-backed catalog store.
    pub catalog_dir: PathBuf,
    /// Storage quota for the catalog store; `None` means unlimited.
    pub catalog_quota_bytes: Option<u64>,
    /// Largest accepted source photo, in decoded bytes.
    pub max_photo_bytes: u64,
    /// Return the source photo, flagged `demo`, when every provider fails.
    pub demo_fallback: bool,
    /// Accept `http` and private-address style image URLs.
    pub allow_insecure_style_urls: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            allowed_origins: AllowedOrigins::Any,
            catalog_dir: PathBuf::from(defaults::CATALOG_DIR),
            catalog_quota_bytes: Some(defaults::STORAGE_QUOTA_BYTES),
            max_photo_bytes: defaults::MAX_PHOTO_BYTES,
            demo_fallback: false,
            allow_insecure_style_urls: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default     |
    /// |-----------------------|-------------|
    /// | `HOST`                | `0.0.0.0`   |
    /// | `PORT`                | `3000`      |
    /// | `ALLOWED_ORIGINS`     | `*`         |
    /// | `CATALOG_DIR`         | `./data`    |
    /// | `CATALOG_QUOTA_BYTES` | `5242880` (`0` disables) |
    /// | `MAX_PHOTO_BYTES`     | `10485760`  |
    /// | `DEMO_FALLBACK`       | `false`     |
    /// | `ALLOW_INSECURE_STYLE_URLS` | `false` |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(defaults::ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = get(defaults::ENV_PORT) {
            config.port = parse_var(defaults::ENV_PORT, &port)?;
        }
        if let Some(origins) = get(defaults::ENV_ALLOWED_ORIGINS) {
            config.allowed_origins = AllowedOrigins::parse(&origins);
        }
        if let Some(dir) = get(defaults::ENV_CATALOG_DIR) {
            config.catalog_dir = PathBuf::from(dir);
        }
        if let Some(quota) = get(defaults::ENV_CATALOG_QUOTA_BYTES) {
            let quota: u64 = parse_var(defaults::ENV_CATALOG_QUOTA_BYTES, &quota)?;
            config.catalog_quota_bytes = (quota > 0).then_some(quota);
        }
        if let Some(limit) = get(defaults::ENV_MAX_PHOTO_BYTES) {
            config.max_photo_bytes = parse_var(defaults::ENV_MAX_PHOTO_BYTES, &limit)?;
        }
        if let Some(flag) = get(defaults::ENV_DEMO_FALLBACK) {
            config.demo_fallback = parse_flag(defaults::ENV_DEMO_FALLBACK, &flag)?;
        }
        if let Some(flag) = get(defaults::ENV_ALLOW_INSECURE_STYLE_URLS) {
            config.allow_insecure_style_urls =
                parse_flag(defaults::ENV_ALLOW_INSECURE_STYLE_URLS, &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_photo_bytes == 0 {
            return Err(Error::Config(format!(
                "{} must be greater than zero",
                defaults::ENV_MAX_PHOTO_BYTES
            )));
        }
        Ok(())
    }

    /// HTTP body limit: the photo limit after base64 inflation, plus room
    /// for the reference image and the rest of the JSON.
    pub fn body_limit(&self) -> usize {
        let inflated = self.max_photo_bytes.saturating_mul(4) / 3;
        usize::try_from(inflated)
            .unwrap_or(usize::MAX)
            .saturating_add(defaults::BODY_LIMIT_OVERHEAD_BYTES)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", name, value, e)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be true or false, got '{}'",
            name, value
        ))),
    }
}
