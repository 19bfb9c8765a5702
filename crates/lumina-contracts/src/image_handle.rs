use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Display-ready encoded image: `data:<mime>;base64,<payload>`.
///
/// The payload is kept base64-encoded because every consumer (gateway
/// requests, session history, text rendering) wants it that way. Bytes are
/// only decoded when writing to disk or inspecting pixels.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageHandle {
    mime_type: String,
    payload: String,
}

impl ImageHandle {
    pub fn from_base64(payload: impl Into<String>, mime_type: impl Into<String>) -> Result<Self> {
        let payload = payload.into().trim().to_string();
        if payload.is_empty() {
            bail!("image payload is empty");
        }
        let mime_type = normalize_mime(&mime_type.into());
        Ok(Self { mime_type, payload })
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self> {
        if bytes.is_empty() {
            bail!("image payload is empty");
        }
        Self::from_base64(BASE64.encode(bytes), mime_type)
    }

    pub fn from_data_url(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let Some(rest) = trimmed.strip_prefix("data:") else {
            bail!("not a data URL");
        };
        let Some((header, payload)) = rest.split_once(',') else {
            bail!("data URL is missing its payload separator");
        };
        let Some(mime_type) = header.strip_suffix(";base64") else {
            bail!("data URL is not base64-encoded");
        };
        Self::from_base64(payload, mime_type)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        let mime = mime_for_path(path).unwrap_or(DEFAULT_IMAGE_MIME);
        Self::from_bytes(&bytes, mime)
            .with_context(|| format!("{} is not a usable image", path.display()))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn base64_payload(&self) -> &str {
        &self.payload
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.payload)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.payload.as_bytes())
            .context("image payload is not valid base64")
    }

    /// Short content hash, stable across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.mime_type.as_bytes());
        hasher.update(self.payload.as_bytes());
        hex::encode(&hasher.finalize()[..6])
    }

    pub fn file_extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    pub fn encoded_len(&self) -> usize {
        self.payload.len()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("mime_type", &self.mime_type)
            .field("fingerprint", &self.fingerprint())
            .field("encoded_len", &self.payload.len())
            .finish()
    }
}

impl TryFrom<String> for ImageHandle {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_data_url(&value)
    }
}

impl From<ImageHandle> for String {
    fn from(value: ImageHandle) -> Self {
        value.to_data_url()
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    if lowered.contains("gif") {
        return "gif";
    }
    "png"
}

fn normalize_mime(raw: &str) -> String {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        DEFAULT_IMAGE_MIME.to_string()
    } else {
        trimmed
    }
}
