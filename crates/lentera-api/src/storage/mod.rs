//! Object storage for uploaded images
//!
//! Uploads are validated against an [`UploadPolicy`] (allowed image
//! extensions and a per-resource size limit) and stored under a generated
//! key of the form `<dir>/<PREFIX>_<YYYYMMDDHHMMSS>_<16 hex>.<ext>`. The key
//! is what gets persisted on the owning record.

pub mod memory;
pub mod multipart;
pub mod s3;

pub use self::memory::MemoryStorage;
pub use self::multipart::{MultipartForm, UploadedFile};
pub use self::s3::S3Storage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

/// Image extensions accepted for every upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File '{field}' exceeds the {limit} byte limit")]
    TooLarge { field: String, limit: usize },

    #[error("File type not allowed: {0}")]
    InvalidExtension(String),

    #[error("File '{0}' is required")]
    MissingFile(String),

    #[error("{0}")]
    Multipart(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Backend holding uploaded objects
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Cheap reachability check for readiness checks
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Where and how large a kind of upload may be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub dir: &'static str,
    pub prefix: &'static str,
    pub max_bytes: usize,
}

impl UploadPolicy {
    pub const MEETING_SESSION: UploadPolicy = UploadPolicy {
        dir: "meeting_sessions",
        prefix: "MEET-SESSION",
        max_bytes: 500 * 1024,
    };

    pub const TESTIMONER: UploadPolicy = UploadPolicy {
        dir: "testimoners",
        prefix: "TESTIMONER",
        max_bytes: 1024 * 1024,
    };

    pub const STATIC_ASSET: UploadPolicy = UploadPolicy {
        dir: "static_assets",
        prefix: "STATIC",
        max_bytes: 500 * 1024,
    };

    /// Reject files that are too large or not an allowed image type
    pub fn check(&self, file: &UploadedFile) -> Result<String, StorageError> {
        if file.bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                field: file.field.clone(),
                limit: self.max_bytes,
            });
        }
        allowed_extension(&file.file_name)
            .ok_or_else(|| StorageError::InvalidExtension(file.file_name.clone()))
    }

    /// Object key for a new upload with extension `ext`
    pub fn object_key(&self, ext: &str, now: DateTime<Utc>) -> String {
        let mut suffix = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut suffix);

        format!(
            "{}/{}_{}_{}.{}",
            self.dir,
            self.prefix,
            now.format("%Y%m%d%H%M%S"),
            hex::encode(suffix),
            ext
        )
    }
}

/// Lowercased extension of `file_name` if it is an allowed image type
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Validate and store `file`, returning its object key
pub async fn upload(
    storage: &dyn ObjectStorage,
    policy: UploadPolicy,
    file: UploadedFile,
) -> Result<String, StorageError> {
    let ext = policy.check(&file)?;
    let key = policy.object_key(&ext, Utc::now());

    storage.put(&key, file.bytes, content_type_for(&ext)).await?;
    debug!(key = %key, field = %file.field, "Stored upload");
    Ok(key)
}

/// Best-effort delete of a replaced or orphaned object
pub async fn remove_quietly(storage: &dyn ObjectStorage, key: &str) {
    if let Err(e) = storage.delete(key).await {
        warn!(key = %key, error = %e, "Failed to remove stored object");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            field: "photo".to_string(),
            file_name: name.to_string(),
            content_type: None,
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("proof.JPG"), Some("jpg".to_string()));
        assert_eq!(allowed_extension("a.b.webp"), Some("webp".to_string()));
        assert_eq!(allowed_extension("script.exe"), None);
        assert_eq!(allowed_extension("noext"), None);
        assert_eq!(allowed_extension(".png"), None);
    }

    #[test]
    fn test_check_size_limit() {
        let policy = UploadPolicy::MEETING_SESSION;
        assert!(policy.check(&file("ok.png", 500 * 1024)).is_ok());
        assert!(matches!(
            policy.check(&file("big.png", 500 * 1024 + 1)),
            Err(StorageError::TooLarge { .. })
        ));
        assert!(UploadPolicy::TESTIMONER
            .check(&file("big.png", 500 * 1024 + 1))
            .is_ok());
    }

    #[test]
    fn test_check_rejects_extension() {
        let result = UploadPolicy::STATIC_ASSET.check(&file("doc.pdf", 10));
        assert!(matches!(result, Err(StorageError::InvalidExtension(_))));
    }

    #[test]
    fn test_object_key_format() {
        let now = DateTime::parse_from_rfc3339("2025-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        let key = UploadPolicy::TESTIMONER.object_key("png", now);

        assert!(key.starts_with("testimoners/TESTIMONER_20250304050607_"));
        assert!(key.ends_with(".png"));
        let hex_part = key
            .trim_start_matches("testimoners/TESTIMONER_20250304050607_")
            .trim_end_matches(".png");
        assert_eq!(hex_part.len(), 16);
    }

    #[tokio::test]
    async fn test_upload_stores_object() {
        let storage = MemoryStorage::new();
        let key = upload(&storage, UploadPolicy::STATIC_ASSET, file("logo.webp", 64))
            .await
            .unwrap();

        assert!(key.starts_with("static_assets/STATIC_"));
        assert!(storage.contains(&key).await);

        remove_quietly(&storage, &key).await;
        assert!(!storage.contains(&key).await);
    }

    proptest! {
        #[test]
        fn prop_keys_stay_inside_policy_dir(name in "[a-zA-Z0-9_ -]{1,24}", ext in "(jpg|JPEG|png|Gif|webp)") {
            let file_name = format!("{name}.{ext}");
            let policy = UploadPolicy::MEETING_SESSION;
            let checked = policy.check(&file(&file_name, 1)).unwrap();
            let key = policy.object_key(&checked, Utc::now());

            prop_assert!(key.starts_with("meeting_sessions/MEET-SESSION_"));
            prop_assert!(!key.contains(' '));
            prop_assert!(key.ends_with(&ext.to_ascii_lowercase()));
        }

        #[test]
        fn prop_unlisted_extensions_rejected(ext in "[a-z]{1,5}") {
            prop_assume!(!ALLOWED_EXTENSIONS.contains(&ext.as_str()));
            let name = format!("file.{}", ext);
            prop_assert!(allowed_extension(&name).is_none());
        }
    }
}
