use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

use crate::features::attachments::dtos::{PHOTO_CONTENT_TYPES, REPORT_FILE_CONTENT_TYPES};

/// Kind of entity an attachment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "attachment_owner_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Evaluation photos, many per evaluation
    Evaluation,
    /// Report file, at most one per report
    Report,
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerKind::Evaluation => write!(f, "evaluation"),
            OwnerKind::Report => write!(f, "report"),
        }
    }
}

/// Which evaluation or report an attachment belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub kind: OwnerKind,
    pub id: i64,
}

impl OwnerRef {
    pub fn evaluation(id: i64) -> Self {
        Self {
            kind: OwnerKind::Evaluation,
            id,
        }
    }

    pub fn report(id: i64) -> Self {
        Self {
            kind: OwnerKind::Report,
            id,
        }
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Database model for attachment metadata
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    pub bucket: String,
    pub blob_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn owner(&self) -> OwnerRef {
        OwnerRef {
            kind: self.owner_kind,
            id: self.owner_id,
        }
    }
}

/// Data for recording a blob that was already written
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub owner: OwnerRef,
    pub bucket: String,
    pub blob_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

/// Raw upload as received from the caller
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// Constraints checked before any byte reaches storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_size: usize,
    pub allowed_types: &'static [&'static str],
}

impl UploadLimits {
    pub fn photos(max_size: usize) -> Self {
        Self {
            max_size,
            allowed_types: PHOTO_CONTENT_TYPES,
        }
    }

    pub fn report_files(max_size: usize) -> Self {
        Self {
            max_size,
            allowed_types: REPORT_FILE_CONTENT_TYPES,
        }
    }
}

/// Presigned download URL and the moment it stops working
#[derive(Debug, Clone, PartialEq)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}
