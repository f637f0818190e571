//! Cover image uploads.
//!
//! Covers are written to the uploads directory as `{uuid}.{ext}` and served
//! back under `/uploads/`. The declared content type must be one of the
//! accepted image types and must agree with the file's magic bytes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Public URL prefix the uploads directory is mounted at.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Largest accepted cover, in bytes (5 MiB).
pub const MAX_COVER_BYTES: usize = 5 * 1024 * 1024;

/// Multipart field carrying the file.
pub const COVER_FIELD: &str = "cover";

/// Errors that can occur while storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing multipart field `{COVER_FIELD}`")]
    MissingFile,

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("file content does not match {0}")]
    ContentMismatch(String),

    #[error("file is larger than {max} bytes")]
    TooLarge { max: usize },

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// An accepted image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageType {
    /// Map a MIME type to an accepted image type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }

    /// Whether `bytes` starts with this type's signature.
    #[must_use]
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Gif => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
            Self::Webp => bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()),
        }
    }
}

/// A cover written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedCover {
    /// Public path, e.g. `/uploads/5f0c....png`.
    pub public_path: String,
    pub file_path: PathBuf,
}

/// Check a cover and write it to `dir`.
///
/// # Errors
///
/// Returns `UploadError::UnsupportedType`, `ContentMismatch` or `TooLarge`
/// for rejected files and `UploadError::Io` if the file cannot be written.
pub async fn save_cover(
    dir: &Path,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<UploadedCover, UploadError> {
    let mime = content_type.unwrap_or("application/octet-stream");
    let image = ImageType::from_mime(mime).ok_or_else(|| UploadError::UnsupportedType(mime.to_owned()))?;
    if bytes.len() > MAX_COVER_BYTES {
        return Err(UploadError::TooLarge {
            max: MAX_COVER_BYTES,
        });
    }
    if !image.matches(bytes) {
        return Err(UploadError::ContentMismatch(mime.to_owned()));
    }

    tokio::fs::create_dir_all(dir).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), image.extension());
    let file_path = dir.join(&file_name);
    tokio::fs::write(&file_path, bytes).await?;

    tracing::info!(file = %file_name, size = bytes.len(), "Stored cover image");
    Ok(UploadedCover {
        public_path: format!("{PUBLIC_PREFIX}{file_name}"),
        file_path,
    })
}

/// Delete a previously stored cover. Paths outside the uploads mount and
/// files that are already gone are ignored.
pub async fn remove_cover(dir: &Path, public_path: &str) {
    let Some(name) = public_path.strip_prefix(PUBLIC_PREFIX) else {
        return;
    };
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(dir.join(name)).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(error = %e, file = name, "Failed to remove old cover");
    }
}
