//! Provider configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (`HAIRFIT_PROVIDERS_CONFIG`, default
//!   `~/.config/hairfit/providers.toml`) with `${VAR}` substitution
//! - environment variables (`GEMINI_API_KEY`, `REPLICATE_API_TOKEN`, ...)
//!
//! # Example
//!
//! ```toml
//! [providers]
//! chain = ["gemini", "huggingface"]
//! timeout_secs = 90
//!
//! [providers.gemini]
//! api_key = "${GEMINI_API_KEY}"
//! models = ["gemini-2.0-flash-exp-image-generation"]
//!
//! [providers.huggingface]
//! api_key = "${HUGGINGFACE_API_KEY}"
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hairfit_core::defaults;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for hairfit_core::Error {
    fn from(e: ConfigError) -> Self {
        hairfit_core::Error::Config(e.to_string())
    }
}

/// Provider kinds that can appear in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    Replicate,
    #[serde(alias = "hf")]
    HuggingFace,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Gemini,
        ProviderKind::Replicate,
        ProviderKind::HuggingFace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Replicate => "replicate",
            Self::HuggingFace => "huggingface",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "replicate" => Ok(Self::Replicate),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate_base_url(provider: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} base_url cannot be empty",
            provider
        )));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{} base_url must start with http:// or https://, got: {}",
            provider, url
        )));
    }
    Ok(())
}

fn validate_models(provider: &str, models: &[String]) -> ConfigResult<()> {
    if models.is_empty() || models.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{} models must be a non-empty list of names",
            provider
        )));
    }
    Ok(())
}

/// A secret counts only if it is non-blank and not an unresolved `${VAR}`.
fn has_secret(secret: &Option<String>) -> bool {
    secret
        .as_deref()
        .map(str::trim)
        .is_some_and(|s| !s.is_empty() && !s.starts_with("${"))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn env_list(name: &str) -> Option<Vec<String>> {
    let raw = env::var(name).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

fn env_secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// `REPLICATE_API_TOKEN`, falling back to the older `REPLICATE_API_KEY`.
fn replicate_token_from_env() -> Option<String> {
    env_secret(defaults::ENV_REPLICATE_API_TOKEN)
        .or_else(|| env_secret(defaults::ENV_REPLICATE_API_KEY))
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Models tried in order.
    pub models: Vec<String>,
    /// Largest remote style image the provider will download.
    pub style_image_max_bytes: u64,
    /// Also fetch style images over plain http or from private addresses.
    pub allow_insecure_style_urls: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::GEMINI_URL.to_string(),
            models: to_strings(defaults::GEMINI_MODELS),
            style_image_max_bytes: defaults::MAX_PHOTO_BYTES,
            allow_insecure_style_urls: false,
        }
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("Gemini", &self.base_url)?;
        if self.style_image_max_bytes == 0 {
            return Err(ConfigError::Validation(
                "Gemini style_image_max_bytes must be greater than 0".to_string(),
            ));
        }
        validate_models("Gemini", &self.models)
    }

    pub fn has_credentials(&self) -> bool {
        has_secret(&self.api_key)
    }
}

/// Replicate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub base_url: String,
    /// Model version hash passed when creating predictions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: defaults::REPLICATE_URL.to_string(),
            version: None,
            poll_interval_ms: defaults::REPLICATE_POLL_INTERVAL_MS,
            max_poll_attempts: defaults::REPLICATE_MAX_POLL_ATTEMPTS,
        }
    }
}

impl ReplicateConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("Replicate", &self.base_url)?;
        if self.max_poll_attempts == 0 {
            return Err(ConfigError::Validation(
                "Replicate max_poll_attempts must be at least 1".to_string(),
            ));
        }
        if has_secret(&self.api_token) && !has_secret(&self.version) {
            return Err(ConfigError::Validation(
                "Replicate version is required when an api_token is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        has_secret(&self.api_token) && has_secret(&self.version)
    }
}

/// Hugging Face inference API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Models tried in order.
    pub models: Vec<String>,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::HUGGINGFACE_URL.to_string(),
            models: to_strings(defaults::HUGGINGFACE_MODELS),
        }
    }
}

impl HuggingFaceConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_base_url("Hugging Face", &self.base_url)?;
        validate_models("Hugging Face", &self.models)
    }

    pub fn has_credentials(&self) -> bool {
        has_secret(&self.api_key)
    }
}

/// Full provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider order; the first success wins.
    pub chain: Vec<ProviderKind>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    pub gemini: GeminiConfig,
    pub replicate: ReplicateConfig,
    pub huggingface: HuggingFaceConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            chain: ProviderKind::ALL.to_vec(),
            timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
            gemini: GeminiConfig::default(),
            replicate: ReplicateConfig::default(),
            huggingface: HuggingFaceConfig::default(),
        }
    }
}

impl ProvidersConfig {
    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("hairfit");
        path.push("providers.toml");
        path
    }

    /// Load from the configured file if it exists, otherwise from the
    /// environment.
    pub fn load() -> ConfigResult<Self> {
        let path = env::var(defaults::ENV_PROVIDERS_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_config_path());

        if path.exists() {
            info!("Loading provider config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Provider config not found at {}, using environment variables",
                path.display()
            );
            let config = Self::from_env()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Load from a TOML file with `${VAR}` substitution.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let content = Self::substitute_env_vars(content);

        #[derive(Deserialize)]
        struct TomlRoot {
            providers: TomlProviders,
        }

        #[derive(Deserialize)]
        struct TomlProviders {
            #[serde(default)]
            chain: Option<Vec<String>>,
            #[serde(default)]
            timeout_secs: Option<u64>,
            #[serde(default)]
            gemini: Option<GeminiConfig>,
            #[serde(default)]
            replicate: Option<ReplicateConfig>,
            #[serde(default)]
            huggingface: Option<HuggingFaceConfig>,
        }

        let root: TomlRoot = toml::from_str(&content)?;
        let providers = root.providers;

        let chain = match providers.chain {
            Some(names) => names
                .iter()
                .map(|n| n.parse())
                .collect::<ConfigResult<Vec<_>>>()?,
            None => ProviderKind::ALL.to_vec(),
        };

        let config = Self {
            chain,
            timeout_secs: providers
                .timeout_secs
                .unwrap_or(defaults::PROVIDER_TIMEOUT_SECS),
            gemini: providers.gemini.unwrap_or_default(),
            replicate: providers.replicate.unwrap_or_default(),
            huggingface: providers.huggingface.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables.
    ///
    /// Fails only when `TRANSFORM_CHAIN` names an unknown provider.
    pub fn from_env() -> ConfigResult<Self> {
        let chain = match env_list(defaults::ENV_TRANSFORM_CHAIN) {
            Some(names) => names
                .iter()
                .map(|n| n.parse())
                .collect::<ConfigResult<Vec<_>>>()?,
            None => ProviderKind::ALL.to_vec(),
        };

        let timeout_secs = env::var(defaults::ENV_PROVIDER_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults::PROVIDER_TIMEOUT_SECS);

        let gemini = GeminiConfig {
            api_key: env_secret(defaults::ENV_GEMINI_API_KEY),
            base_url: env::var(defaults::ENV_GEMINI_BASE_URL)
                .unwrap_or_else(|_| defaults::GEMINI_URL.to_string()),
            models: env_list(defaults::ENV_GEMINI_MODELS)
                .unwrap_or_else(|| to_strings(defaults::GEMINI_MODELS)),
            ..GeminiConfig::default()
        };

        let replicate = ReplicateConfig {
            api_token: replicate_token_from_env(),
            base_url: env::var(defaults::ENV_REPLICATE_BASE_URL)
                .unwrap_or_else(|_| defaults::REPLICATE_URL.to_string()),
            version: env_secret(defaults::ENV_REPLICATE_VERSION),
            ..ReplicateConfig::default()
        };

        let huggingface = HuggingFaceConfig {
            api_key: env_secret(defaults::ENV_HUGGINGFACE_API_KEY),
            base_url: env::var(defaults::ENV_HUGGINGFACE_BASE_URL)
                .unwrap_or_else(|_| defaults::HUGGINGFACE_URL.to_string()),
            models: env_list(defaults::ENV_HUGGINGFACE_MODELS)
                .unwrap_or_else(|| to_strings(defaults::HUGGINGFACE_MODELS)),
        };

        Ok(Self {
            chain,
            timeout_secs,
            gemini,
            replicate,
            huggingface,
        })
    }

    /// Providers in chain order that have credentials.
    pub fn enabled(&self) -> Vec<ProviderKind> {
        self.chain
            .iter()
            .copied()
            .filter(|kind| match kind {
                ProviderKind::Gemini => self.gemini.has_credentials(),
                ProviderKind::Replicate => self.replicate.has_credentials(),
                ProviderKind::HuggingFace => self.huggingface.has_credentials(),
            })
            .collect()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.chain.is_empty() {
            return Err(ConfigError::Validation(
                "provider chain cannot be empty".to_string(),
            ));
        }
        for (i, kind) in self.chain.iter().enumerate() {
            if self.chain[..i].contains(kind) {
                return Err(ConfigError::Validation(format!(
                    "provider '{}' appears twice in the chain",
                    kind
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        self.gemini.validate()?;
        self.replicate.validate()?;
        self.huggingface.validate()?;
        Ok(())
    }

    /// Substitute `${VAR}` references with environment values.
    ///
    /// Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let re = match regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") {
            Ok(re) => re,
            Err(_) => return content.to_string(),
        };
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }
}
