//! Image upload service.

use std::sync::Arc;

use scribe_common::{
    AppError, AppResult, StorageBackend, UploadedFile, config::StorageSettings,
    generate_storage_key,
};
use scribe_db::entities::blog_post;

/// Image served for posts created without an avatar.
const DEFAULT_AVATAR_PNG: &[u8] = include_bytes!("../../assets/portrait_placeholder.png");

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG format
    Jpeg,
    /// PNG format
    Png,
}

impl ImageFormat {
    /// Detect format from a MIME type. Only JPEG and PNG are accepted.
    #[must_use]
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Canonical MIME type.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// File extension used for stored files.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Stores uploaded images and removes them again by URL.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn StorageBackend>,
    max_upload_bytes: usize,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, settings: &StorageSettings) -> Self {
        Self {
            storage,
            max_upload_bytes: settings.max_upload_bytes,
        }
    }

    /// Largest accepted upload, in bytes.
    #[must_use]
    pub const fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate and store an image uploaded by `user_id`.
    pub async fn upload_image(
        &self,
        user_id: &str,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<UploadedFile> {
        let format = ImageFormat::from_mime_type(content_type).ok_or_else(|| {
            AppError::UnsupportedMediaType(format!(
                "Only image files are allowed! Got {content_type}"
            ))
        })?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        if data.len() > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Image is {} bytes, limit is {}",
                data.len(),
                self.max_upload_bytes
            )));
        }

        let key = generate_storage_key(user_id, &format!("image.{}", format.extension()));
        let uploaded = self.storage.upload(&key, data, format.mime_type()).await?;

        tracing::info!(
            user_id = %user_id,
            key = %uploaded.key,
            size = uploaded.size,
            "Image uploaded"
        );

        Ok(uploaded)
    }

    /// Put the default post avatar in storage unless it is already there.
    ///
    /// Returns `true` when the file was written.
    pub async fn install_default_avatar(&self) -> AppResult<bool> {
        let Some(key) = self.storage.key_for_url(blog_post::DEFAULT_AVATAR) else {
            tracing::warn!(
                url = blog_post::DEFAULT_AVATAR,
                "Default avatar is outside the upload base URL, not installing it"
            );
            return Ok(false);
        };
        if self.storage.exists(&key).await? {
            return Ok(false);
        }
        self.storage
            .upload(&key, DEFAULT_AVATAR_PNG, ImageFormat::Png.mime_type())
            .await?;
        tracing::info!(key = %key, "Installed default avatar");
        Ok(true)
    }

    /// Delete an image by its public URL, provided `owner` uploaded it.
    ///
    /// URLs not served by this storage, and files uploaded by someone else,
    /// are left alone and `false` is returned.
    pub async fn delete_by_url(&self, url: &str, owner: &str) -> AppResult<bool> {
        let Some(key) = self.storage.key_for_url(url) else {
            return Ok(false);
        };
        if uploader_of(&key) != Some(owner) {
            tracing::warn!(
                key = %key,
                owner = %owner,
                "Refusing to delete image uploaded by another user"
            );
            return Ok(false);
        }
        self.storage.delete(&key).await?;
        tracing::debug!(key = %key, "Image deleted");
        Ok(true)
    }
}

/// Uploader segment of a key produced by `generate_storage_key`
/// (`YYYY/MM/DD/<user>/<file>`).
fn uploader_of(key: &str) -> Option<&str> {
    let segments: Vec<&str> = key.split('/').collect();
    match segments.as_slice() {
        [_, _, _, user, file] if !user.is_empty() && !file.is_empty() => Some(*user),
        _ => None,
    }
}
