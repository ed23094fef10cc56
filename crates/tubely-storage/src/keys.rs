//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{random_id}.{ext}`. The random id carries 256 bits of
//! entropy, so keys are not checked against the store for collisions.

use std::fmt::{Display, Formatter, Result as FmtResult};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

use crate::{StorageError, StorageResult};

/// Number of random bytes in an asset id.
pub const ASSET_ID_BYTES: usize = 32;

/// Object-store path of a published asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    /// Generate a fresh key under `prefix` for a file of `media_type`.
    pub fn generate(prefix: &str, media_type: &str) -> StorageResult<Self> {
        let extension = media_type_extension(media_type).ok_or_else(|| {
            StorageError::InvalidKey(format!("Cannot derive extension from '{}'", media_type))
        })?;
        Self::from_parts(prefix, &random_asset_id(), extension)
    }

    fn from_parts(prefix: &str, id: &str, extension: &str) -> StorageResult<Self> {
        let key = format!("{}/{}.{}", prefix.trim_matches('/'), id, extension);
        validate_key(&key)?;
        Ok(AssetKey(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading path segment (the orientation prefix for video assets)
    pub fn prefix(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl Display for AssetKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 32 random bytes encoded as unpadded URL-safe base64.
pub fn random_asset_id() -> String {
    let mut bytes = [0u8; ASSET_ID_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// File extension for a media type: its subtype (`video/mp4` → `mp4`).
///
/// Media-type parameters are ignored.
pub fn media_type_extension(media_type: &str) -> Option<&str> {
    let essence = media_type.split(';').next()?.trim();
    let (_, subtype) = essence.split_once('/')?;
    let subtype = subtype.trim();
    if subtype.is_empty() || !subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(subtype)
}

/// Reject keys that could escape the bucket namespace.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_layout() {
        let key = AssetKey::generate("landscape", "video/mp4").unwrap();
        let (prefix, file) = key.as_str().split_once('/').unwrap();
        assert_eq!(prefix, "landscape");
        assert_eq!(key.prefix(), "landscape");
        let (id, ext) = file.rsplit_once('.').unwrap();
        assert_eq!(ext, "mp4");
        // 32 bytes -> 43 unpadded base64 characters
        assert_eq!(id.len(), 43);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_keys_are_unique() {
        let a = AssetKey::generate("other", "video/mp4").unwrap();
        let b = AssetKey::generate("other", "video/mp4").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_media_type_extension() {
        assert_eq!(media_type_extension("video/mp4"), Some("mp4"));
        assert_eq!(media_type_extension("video/mp4; codecs=avc1"), Some("mp4"));
        assert_eq!(media_type_extension("mp4"), None);
        assert_eq!(media_type_extension("video/"), None);
        assert_eq!(media_type_extension("video/../etc"), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("portrait/abc.mp4").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/portrait/abc.mp4").is_err());
        assert!(validate_key("portrait/../abc.mp4").is_err());
    }

    #[test]
    fn test_from_parts_trims_slashes() {
        let key = AssetKey::from_parts("/portrait/", "abc", "mp4").unwrap();
        assert_eq!(key.to_string(), "portrait/abc.mp4");
    }
}
