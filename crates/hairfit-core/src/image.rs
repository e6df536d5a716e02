//! Image payloads: in-memory images, data URLs, and image references.
//!
//! Images travel over the wire and through storage as `data:` URLs. Catalog
//! entries may also point at a remote `http(s)` URL instead of embedding the
//! bytes.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::defaults;
use crate::error::{Error, Result};

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// An image held in memory together with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    mime_type: String,
    bytes: Vec<u8>,
}

impl ImageData {
    /// Wrap raw bytes with an explicit MIME type.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Wrap raw bytes, detecting the MIME type from magic bytes.
    ///
    /// Fails with `InvalidInput` when the payload is empty or is recognizably
    /// not an image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("image data is empty".to_string()));
        }
        let mime_type = detect_image_mime(&bytes)?;
        Ok(Self { mime_type, bytes })
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url.trim().strip_prefix(DATA_URL_PREFIX).ok_or_else(|| {
            Error::InvalidInput("image is not a data URL (missing 'data:' prefix)".to_string())
        })?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("data URL has no payload separator".to_string()))?;
        if !header.ends_with(BASE64_MARKER) {
            return Err(Error::InvalidInput(
                "data URL payload must be base64 encoded".to_string(),
            ));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid base64 image data: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::InvalidInput("image data is empty".to_string()));
        }

        let declared = header
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        let mime_type = match declared {
            Some(m) => m.to_string(),
            None => detect_image_mime(&bytes)?,
        };

        Ok(Self { mime_type, bytes })
    }

    /// Encode as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "{}{}{},{}",
            DATA_URL_PREFIX,
            self.mime_type,
            BASE64_MARKER,
            self.to_base64()
        )
    }

    /// Encode the bytes as standard base64 (no data URL header).
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for ImageData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ImageData::from_data_url(&s).map_err(de::Error::custom)
    }
}

/// Reference to an image: inline bytes or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Inline(ImageData),
    Remote(String),
}

impl ImageSource {
    /// Parse the wire form: a `data:` URL or an `http(s)://` URL.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with(DATA_URL_PREFIX) {
            return ImageData::from_data_url(trimmed).map(ImageSource::Inline);
        }
        if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
            return Ok(ImageSource::Remote(trimmed.to_string()));
        }
        Err(Error::InvalidInput(
            "image must be a data URL or an http(s) URL".to_string(),
        ))
    }

    /// The wire form of this reference.
    pub fn to_wire(&self) -> String {
        match self {
            ImageSource::Inline(data) => data.to_data_url(),
            ImageSource::Remote(url) => url.clone(),
        }
    }

    pub fn as_inline(&self) -> Option<&ImageData> {
        match self {
            ImageSource::Inline(data) => Some(data),
            ImageSource::Remote(_) => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageSource::Remote(_))
    }
}

/// Check that a remote image URL may be fetched on a caller's behalf.
///
/// Only `https` URLs naming a public host pass. `allow_insecure` also admits
/// plain `http` and loopback or private addresses. Hostnames are not resolved,
/// so a public name pointing at a private address is not caught here.
pub fn check_remote_url(url: &str, allow_insecure: bool) -> Result<reqwest::Url> {
    let parsed = reqwest::Url::parse(url.trim())
        .map_err(|e| Error::InvalidInput(format!("invalid image URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "https" => {}
        "http" if allow_insecure => {}
        scheme => {
            return Err(Error::InvalidInput(format!(
                "image URL scheme '{}' is not allowed, use https",
                scheme
            )))
        }
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidInput(format!("image URL '{}' has no host", url)))?;
    if !allow_insecure && is_internal_host(host) {
        return Err(Error::InvalidInput(format!(
            "image URL host '{}' is not publicly routable",
            host
        )));
    }
    Ok(parsed)
}

fn is_internal_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") || host.to_ascii_lowercase().ends_with(".localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            ip.is_loopback()
                || ip.is_private()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast()
        }
        Ok(IpAddr::V6(ip)) => {
            if let Some(v4) = ip.to_ipv4_mapped() {
                return is_internal_host(&v4.to_string());
            }
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
        Err(_) => false,
    }
}

impl From<ImageData> for ImageSource {
    fn from(data: ImageData) -> Self {
        ImageSource::Inline(data)
    }
}

impl Serialize for ImageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for ImageSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ImageSource::parse(&s).map_err(de::Error::custom)
    }
}

/// Detect an image MIME type from magic bytes.
///
/// Payloads with no recognizable signature are assumed to be PNG; payloads
/// recognized as something other than an image are rejected.
pub fn detect_image_mime(data: &[u8]) -> Result<String> {
    match infer::get(data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(Error::InvalidInput(format!(
            "expected an image, got {}",
            kind.mime_type()
        ))),
        None => Ok(defaults::FALLBACK_IMAGE_MIME.to_string()),
    }
}

/// Read an image file into memory, enforcing a size limit before reading.
///
/// The read is a plain future: dropping it cancels the read and nothing is
/// returned, so no partially-read image is ever observable.
pub async fn read_image_file(path: &Path, limit: u64) -> Result<ImageData> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > limit {
        return Err(Error::PayloadTooLarge {
            size: metadata.len(),
            limit,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    // The file may have grown between stat and read.
    if bytes.len() as u64 > limit {
        return Err(Error::PayloadTooLarge {
            size: bytes.len() as u64,
            limit,
        });
    }

    ImageData::from_bytes(bytes)
}
