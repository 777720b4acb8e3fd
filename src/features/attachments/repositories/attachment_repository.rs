use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{Attachment, NewAttachment, OwnerRef};

/// Metadata for blobs held in the object store
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Record a blob. A duplicate `(owner, blob_key)` or a second report file is a `Conflict`.
    async fn insert(&self, data: &NewAttachment) -> Result<Attachment>;

    /// Newest first
    async fn list_by_owner(&self, owner: OwnerRef) -> Result<Vec<Attachment>>;

    async fn find_latest_by_owner(&self, owner: OwnerRef) -> Result<Option<Attachment>>;

    /// Returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct PgAttachmentRepository {
    pool: PgPool,
}

impl PgAttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentRepository for PgAttachmentRepository {
    async fn insert(&self, data: &NewAttachment) -> Result<Attachment> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (owner_kind, owner_id, bucket, blob_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.owner.kind)
        .bind(data.owner.id)
        .bind(&data.bucket)
        .bind(&data.blob_key)
        .bind(&data.content_type)
        .bind(data.size_bytes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to record attachment for {}: {:?}", data.owner, e);
            AppError::from_unique_violation(
                e,
                format!("{} already has an attachment '{}'", data.owner, data.blob_key),
            )
        })?;

        Ok(attachment)
    }

    async fn list_by_owner(&self, owner: OwnerRef) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT * FROM attachments
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner.kind)
        .bind(owner.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attachments)
    }

    async fn find_latest_by_owner(&self, owner: OwnerRef) -> Result<Option<Attachment>> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT * FROM attachments
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(owner.kind)
        .bind(owner.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attachment)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
