use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{Attachment, OwnerKind, SignedUrl};

/// Longest lifetime a signed URL may be requested for (7 days)
pub const MAX_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// MIME types accepted for evaluation photos
pub const PHOTO_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// MIME types accepted for report files
pub const REPORT_FILE_CONTENT_TYPES: &[&str] = &["application/pdf"];

/// Known extensions and the MIME type each one maps to
const EXTENSION_CONTENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
];

/// Get file extension from content type
pub fn get_extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Get content type from a filename's extension
pub fn get_content_type_from_filename(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    EXTENSION_CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// Canonical form of a declared content type: lowercase, no parameters,
/// `image/jpg` folded into `image/jpeg`
pub fn normalize_content_type(declared: &str) -> Option<&'static str> {
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    };

    EXTENSION_CONTENT_TYPES
        .iter()
        .map(|(_, content_type)| *content_type)
        .find(|content_type| *content_type == essence)
}

/// Resolve the effective content type of an upload.
///
/// A filename with a known extension wins; otherwise the declared type is used.
pub fn resolve_content_type(declared: &str, filename: Option<&str>) -> Option<&'static str> {
    filename
        .and_then(get_content_type_from_filename)
        .or_else(|| normalize_content_type(declared))
}

/// Upload photo request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadPhotoDto {
    /// The photo to upload (JPEG, PNG, GIF or WebP)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub photo: String,
}

/// Upload report file request DTO for OpenAPI documentation
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadReportFileDto {
    /// The PDF report
    #[schema(format = Binary, content_media_type = "application/pdf")]
    pub file: String,
}

/// Response DTO for attachment metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponseDto {
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    pub bucket: String,
    /// Object key inside the bucket
    pub blob_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentResponseDto {
    fn from(a: Attachment) -> Self {
        Self {
            id: a.id,
            owner_kind: a.owner_kind,
            owner_id: a.owner_id,
            bucket: a.bucket,
            blob_key: a.blob_key,
            content_type: a.content_type,
            size_bytes: a.size_bytes,
            created_at: a.created_at,
        }
    }
}

/// Response DTO for a presigned download URL
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignedUrlDto {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<SignedUrl> for SignedUrlDto {
    fn from(s: SignedUrl) -> Self {
        Self {
            url: s.url,
            expires_at: s.expires_at,
        }
    }
}

/// Query params for requesting a signed download URL
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AccessUrlQuery {
    /// URL lifetime in seconds (default: server setting, max: 604800)
    #[param(minimum = 1, maximum = 604800)]
    pub expires_in: Option<u64>,
}

impl AccessUrlQuery {
    /// Requested lifetime, `None` when the server default applies
    pub fn ttl(&self) -> Result<Option<Duration>> {
        match self.expires_in {
            None => Ok(None),
            Some(secs) if (1..=MAX_URL_TTL_SECS).contains(&secs) => {
                Ok(Some(Duration::from_secs(secs)))
            }
            Some(secs) => Err(AppError::Validation(format!(
                "expires_in must be between 1 and {} seconds, got {}",
                MAX_URL_TTL_SECS, secs
            ))),
        }
    }
}
