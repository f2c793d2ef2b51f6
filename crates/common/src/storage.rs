//! Storage abstraction for uploaded blog images.

use std::path::{Component, Path, PathBuf};

use crate::{AppError, AppResult};

/// Stored image metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key, relative to the storage root.
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
    /// MD5 hash of the file.
    pub md5: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `key`.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str)
    -> AppResult<UploadedFile>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Map a public URL back to its key, if the URL is served by this backend.
    fn key_for_url(&self, url: &str) -> Option<String>;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }

    /// Root directory files are written under.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::InvalidInput(format!("Invalid storage key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.resolve(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        let md5 = format!("{:x}", md5::compute(data));

        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
            md5,
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/", self.base_url.trim_end_matches('/'));
        url.strip_prefix(&prefix)
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

/// Generate a unique storage key for an image uploaded by `user_id`.
///
/// Keys look like `2024/05/17/<user>/<millis>_<uuid>.<ext>`.
#[must_use]
pub fn generate_storage_key(user_id: &str, original_name: &str) -> String {
    use chrono::Utc;

    let now = Utc::now();
    let date_path = now.format("%Y/%m/%d").to_string();
    let timestamp = now.timestamp_millis();

    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase);

    format!(
        "{}/{}/{}_{}.{}",
        date_path,
        user_id,
        timestamp,
        uuid::Uuid::new_v4(),
        extension
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> LocalStorage {
        let dir = std::env::temp_dir().join(format!("scribe-storage-{}", uuid::Uuid::new_v4()));
        LocalStorage::new(dir, "/uploads".to_string())
    }

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("user123", "photo.JPG");
        assert!(key.contains("user123"));
        assert!(key.ends_with(".jpg"));
        assert!(key.contains('/'));
    }

    #[test]
    fn test_generate_storage_key_no_extension() {
        let key = generate_storage_key("user123", "file");
        assert!(key.ends_with(".bin"));

        let key = generate_storage_key("user123", "evil.p/ng");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_key_for_url() {
        let storage = temp_storage();
        let url = storage.public_url("2024/01/01/u1/a.png");
        assert_eq!(url, "/uploads/2024/01/01/u1/a.png");
        assert_eq!(
            storage.key_for_url(&url).as_deref(),
            Some("2024/01/01/u1/a.png")
        );
        assert_eq!(
            storage.key_for_url("https://res.cloudinary.com/x/image.png"),
            None
        );
        assert_eq!(storage.key_for_url("/uploads/"), None);
    }

    #[tokio::test]
    async fn test_upload_exists_delete() {
        let storage = temp_storage();
        let uploaded = storage
            .upload("2024/01/01/u1/a.png", b"png-bytes", "image/png")
            .await
            .unwrap();

        assert_eq!(uploaded.size, 9);
        assert_eq!(uploaded.url, "/uploads/2024/01/01/u1/a.png");
        assert!(storage.exists(&uploaded.key).await.unwrap());

        storage.delete(&uploaded.key).await.unwrap();
        assert!(!storage.exists(&uploaded.key).await.unwrap());

        // deleting again is fine
        storage.delete(&uploaded.key).await.unwrap();

        let _ = tokio::fs::remove_dir_all(storage.base_path()).await;
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let storage = temp_storage();
        let result = storage.upload("../outside.png", b"x", "image/png").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
