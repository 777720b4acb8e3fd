//! Keeps attachment rows and object-store blobs consistent.
//!
//! The two stores share no transaction. Writes are ordered so that a row never
//! points at a missing blob: the blob goes first, the row second, and a failed
//! row write is followed by one compensating blob delete. Replacing a singleton
//! removes the old file before the new one is written, so a failure in the
//! second half leaves the owner without a file and the error is returned as-is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::core::config::MinIOConfig;
use crate::core::error::{AppError, Result};
use crate::features::attachments::dtos::{
    get_extension_from_content_type, resolve_content_type, MAX_URL_TTL_SECS,
};
use crate::features::attachments::models::{
    Attachment, FileUpload, NewAttachment, OwnerKind, OwnerRef, SignedUrl, UploadLimits,
};
use crate::features::attachments::repositories::AttachmentRepository;
use crate::features::auth::guards::{ensure_assigned_evaluator, ensure_can_access_evaluation};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::evaluations::repositories::EvaluationRepository;
use crate::features::reports::repositories::ReportRepository;
use crate::modules::storage::BlobStore;

/// Last suffix handed out, shared by every coordinator in the process
static LAST_KEY_SUFFIX: AtomicU64 = AtomicU64::new(0);

/// Next blob key suffix: wall-clock nanoseconds, bumped past the previous value when
/// the clock stalls or steps back.
fn next_key_suffix() -> u64 {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or_default();

    let mut last = LAST_KEY_SUFFIX.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_KEY_SUFFIX.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Object key scoped to the owner
fn blob_key(owner: OwnerRef, suffix: u64, extension: &str) -> String {
    match owner.kind {
        OwnerKind::Evaluation => {
            format!("evaluations/{}/photos/{}.{}", owner.id, suffix, extension)
        }
        OwnerKind::Report => format!("reports/{}/report_{}.{}", owner.id, suffix, extension),
    }
}

#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    /// Bucket recorded on every attachment row
    pub bucket: String,
    /// Lifetime of access URLs when the caller does not ask for one
    pub default_url_ttl: Duration,
}

impl AttachmentConfig {
    pub fn from_minio(config: &MinIOConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            default_url_ttl: config.presigned_url_ttl(),
        }
    }
}

/// Coordinates attachment metadata with blob storage
pub struct AttachmentCoordinator {
    attachments: Arc<dyn AttachmentRepository>,
    evaluations: Arc<dyn EvaluationRepository>,
    reports: Arc<dyn ReportRepository>,
    blob_store: Arc<dyn BlobStore>,
    config: AttachmentConfig,
}

impl AttachmentCoordinator {
    pub fn new(
        attachments: Arc<dyn AttachmentRepository>,
        evaluations: Arc<dyn EvaluationRepository>,
        reports: Arc<dyn ReportRepository>,
        blob_store: Arc<dyn BlobStore>,
        config: AttachmentConfig,
    ) -> Self {
        Self {
            attachments,
            evaluations,
            reports,
            blob_store,
            config,
        }
    }

    /// Check size and type, returning the resolved content type and its extension
    fn validate(
        upload: &FileUpload,
        limits: &UploadLimits,
    ) -> Result<(&'static str, &'static str)> {
        if upload.data.is_empty() {
            return Err(AppError::Validation("File is empty".to_string()));
        }

        if upload.data.len() > limits.max_size {
            return Err(AppError::Validation(format!(
                "File size {} bytes exceeds maximum allowed size of {} bytes",
                upload.data.len(),
                limits.max_size
            )));
        }

        let content_type = resolve_content_type(&upload.content_type, upload.filename.as_deref())
            .filter(|content_type| limits.allowed_types.contains(content_type))
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "Content type '{}' is not allowed. Allowed types: {}",
                    upload.content_type,
                    limits.allowed_types.join(", ")
                ))
            })?;

        let extension = get_extension_from_content_type(content_type).ok_or_else(|| {
            AppError::Internal(format!("No file extension known for '{}'", content_type))
        })?;

        Ok((content_type, extension))
    }

    /// Validate and store a new attachment for `owner`
    pub async fn upload(
        &self,
        owner: OwnerRef,
        upload: FileUpload,
        limits: &UploadLimits,
    ) -> Result<Attachment> {
        let (content_type, extension) = Self::validate(&upload, limits)?;
        self.store(owner, upload.data, content_type, extension).await
    }

    /// Swap the single attachment of `owner` for a new one.
    ///
    /// Every existing file is removed first (blob, then row). If any removal fails
    /// nothing new is written.
    pub async fn replace_singleton(
        &self,
        owner: OwnerRef,
        upload: FileUpload,
        limits: &UploadLimits,
    ) -> Result<Attachment> {
        let (content_type, extension) = Self::validate(&upload, limits)?;

        for existing in self.attachments.list_by_owner(owner).await? {
            self.blob_store.delete(&existing.blob_key).await.map_err(|e| {
                warn!(
                    "Aborting replacement for {}: old blob '{}' could not be deleted",
                    owner, existing.blob_key
                );
                e
            })?;
            self.attachments.delete(existing.id).await?;
            info!(
                "Removed attachment {} ('{}') from {}",
                existing.id, existing.blob_key, existing.owner()
            );
        }

        self.store(owner, upload.data, content_type, extension)
            .await
            .map_err(|e| {
                warn!("Replacement for {} failed after the old file was removed", owner);
                e
            })
    }

    /// Blob first, then the row; undo the blob if the row cannot be written
    async fn store(
        &self,
        owner: OwnerRef,
        data: Vec<u8>,
        content_type: &str,
        extension: &str,
    ) -> Result<Attachment> {
        let key = blob_key(owner, next_key_suffix(), extension);
        let size_bytes = data.len() as i64;

        self.blob_store.put(&key, data, content_type).await?;
        debug!("Stored blob '{}' for {}", key, owner);

        let record = NewAttachment {
            owner,
            bucket: self.config.bucket.clone(),
            blob_key: key,
            content_type: content_type.to_string(),
            size_bytes,
        };

        match self.attachments.insert(&record).await {
            Ok(attachment) => {
                info!(
                    "Attachment saved: id={}, owner={}, key={}, size={}",
                    attachment.id, owner, attachment.blob_key, attachment.size_bytes
                );
                Ok(attachment)
            }
            Err(err) => {
                self.remove_orphan(&record.blob_key).await;
                Err(err)
            }
        }
    }

    /// Compensating delete for a blob whose row was never written
    async fn remove_orphan(&self, key: &str) {
        match self.blob_store.delete(key).await {
            Ok(()) => info!("Removed orphaned blob '{}'", key),
            Err(e) => error!("Failed to remove orphaned blob '{}': {}", key, e),
        }
    }

    /// Attachments of `owner`, newest first
    pub async fn list(&self, owner: OwnerRef) -> Result<Vec<Attachment>> {
        self.attachments.list_by_owner(owner).await
    }

    /// Signed URL for the most recent attachment of `owner`.
    ///
    /// The owner is reloaded and the actor checked against it on every call.
    pub async fn get_access_url(
        &self,
        owner: OwnerRef,
        actor: &AuthenticatedUser,
        ttl: Option<Duration>,
    ) -> Result<SignedUrl> {
        self.authorize_access(owner, actor).await?;

        let attachment = self
            .attachments
            .find_latest_by_owner(owner)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No file attached to {}", owner)))?;

        // Same bounds the object store enforces on presigned URLs
        let ttl = ttl
            .unwrap_or(self.config.default_url_ttl)
            .clamp(Duration::from_secs(1), Duration::from_secs(MAX_URL_TTL_SECS));
        let lifetime = chrono::Duration::from_std(ttl)
            .map_err(|_| AppError::Validation("URL lifetime is out of range".to_string()))?;

        let url = self.blob_store.presign(&attachment.blob_key, ttl).await?;

        Ok(SignedUrl {
            url,
            expires_at: Utc::now() + lifetime,
        })
    }

    async fn authorize_access(&self, owner: OwnerRef, actor: &AuthenticatedUser) -> Result<()> {
        match owner.kind {
            OwnerKind::Evaluation => {
                let evaluation = self
                    .evaluations
                    .find_by_id(owner.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Evaluation with id {} not found", owner.id))
                    })?;
                ensure_can_access_evaluation(actor, &evaluation)
            }
            OwnerKind::Report => {
                let report = self.reports.find_by_id(owner.id).await?.ok_or_else(|| {
                    AppError::NotFound(format!("Report with id {} not found", owner.id))
                })?;
                ensure_assigned_evaluator(actor.user_id, &report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::model::UserRole;
    use crate::shared::test_helpers::{
        pdf_upload, photo_upload, sample_evaluation, sample_report, TestStores,
    };

    const PHOTO_LIMIT: usize = 10 * 1024 * 1024;

    fn photo_limits() -> UploadLimits {
        UploadLimits::photos(PHOTO_LIMIT)
    }

    fn report_limits() -> UploadLimits {
        UploadLimits::report_files(50 * 1024 * 1024)
    }

    #[test]
    fn test_key_suffixes_strictly_increase() {
        let mut previous = next_key_suffix();
        for _ in 0..1000 {
            let next = next_key_suffix();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_blob_keys_are_scoped_to_owner() {
        assert_eq!(
            blob_key(OwnerRef::evaluation(4), 17, "jpg"),
            "evaluations/4/photos/17.jpg"
        );
        assert_eq!(
            blob_key(OwnerRef::report(9), 17, "pdf"),
            "reports/9/report_17.pdf"
        );
    }

    #[tokio::test]
    async fn test_upload_writes_blob_then_row() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::evaluation(1);

        let attachment = coordinator
            .upload(owner, photo_upload(1024), &photo_limits())
            .await
            .unwrap();

        assert_eq!(attachment.owner(), owner);
        assert_eq!(attachment.content_type, "image/jpeg");
        assert_eq!(attachment.size_bytes, 1024);
        assert_eq!(attachment.bucket, TestStores::BUCKET);
        assert!(attachment.blob_key.starts_with("evaluations/1/photos/"));
        assert!(attachment.blob_key.ends_with(".jpg"));
        assert!(stores.blobs.contains(&attachment.blob_key));
    }

    #[tokio::test]
    async fn test_oversized_upload_touches_nothing() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::evaluation(1);

        let err = coordinator
            .upload(owner, photo_upload(11_534_336), &photo_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(coordinator.list(owner).await.unwrap().is_empty());
        assert!(stores.blobs.put_keys().is_empty());
        assert_eq!(stores.blobs.object_count(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_type_is_rejected() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();

        let err = coordinator
            .upload(OwnerRef::evaluation(1), pdf_upload(100), &photo_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(stores.blobs.put_keys().is_empty());
    }

    #[tokio::test]
    async fn test_filename_extension_decides_content_type() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let upload = FileUpload {
            data: vec![1; 64],
            content_type: "application/octet-stream".to_string(),
            filename: Some("side.PNG".to_string()),
        };

        let attachment = coordinator
            .upload(OwnerRef::evaluation(2), upload, &photo_limits())
            .await
            .unwrap();

        assert_eq!(attachment.content_type, "image/png");
        assert!(attachment.blob_key.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_metadata_failure_deletes_orphaned_blob() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::evaluation(1);
        stores.attachments.fail_inserts(true);

        let err = coordinator
            .upload(owner, photo_upload(512), &photo_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        let written = stores.blobs.put_keys();
        assert_eq!(written.len(), 1);
        assert_eq!(stores.blobs.deleted_keys(), written);
        assert!(!stores.blobs.contains(&written[0]));
        assert!(stores.attachments.rows().is_empty());
    }

    #[tokio::test]
    async fn test_failed_compensation_still_returns_original_error() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        stores.attachments.fail_inserts(true);
        stores.blobs.fail_deletes(true);

        let err = coordinator
            .upload(OwnerRef::evaluation(1), photo_upload(512), &photo_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert!(stores.attachments.rows().is_empty());
    }

    #[tokio::test]
    async fn test_blob_failure_leaves_no_row() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        stores.blobs.fail_puts(true);

        let err = coordinator
            .upload(OwnerRef::evaluation(1), photo_upload(512), &photo_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert!(stores.attachments.rows().is_empty());
        assert_eq!(stores.blobs.object_count(), 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::evaluation(3);

        let first = coordinator
            .upload(owner, photo_upload(10), &photo_limits())
            .await
            .unwrap();
        let second = coordinator
            .upload(owner, photo_upload(20), &photo_limits())
            .await
            .unwrap();
        coordinator
            .upload(OwnerRef::evaluation(4), photo_upload(30), &photo_limits())
            .await
            .unwrap();

        let listed = coordinator.list(owner).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_ne!(first.blob_key, second.blob_key);
    }

    #[tokio::test]
    async fn test_replace_singleton_keeps_exactly_one_file() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::report(5);

        let old = coordinator
            .replace_singleton(owner, pdf_upload(100), &report_limits())
            .await
            .unwrap();
        let new = coordinator
            .replace_singleton(owner, pdf_upload(200), &report_limits())
            .await
            .unwrap();

        let listed = coordinator.list(owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].blob_key, new.blob_key);
        assert!(new.blob_key.starts_with("reports/5/report_"));
        assert!(!stores.blobs.contains(&old.blob_key));
        assert!(stores.blobs.contains(&new.blob_key));
    }

    #[tokio::test]
    async fn test_replace_aborts_when_old_blob_delete_fails() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::report(5);
        let old = coordinator
            .replace_singleton(owner, pdf_upload(100), &report_limits())
            .await
            .unwrap();
        stores.blobs.fail_deletes(true);

        let err = coordinator
            .replace_singleton(owner, pdf_upload(200), &report_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        let listed = coordinator.list(owner).await.unwrap();
        assert_eq!(listed, vec![old.clone()]);
        assert!(stores.blobs.contains(&old.blob_key));
        assert_eq!(stores.blobs.put_keys().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_leaves_owner_empty_when_new_write_fails() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::report(5);
        let old = coordinator
            .replace_singleton(owner, pdf_upload(100), &report_limits())
            .await
            .unwrap();
        stores.blobs.fail_puts(true);

        let err = coordinator
            .replace_singleton(owner, pdf_upload(200), &report_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert!(coordinator.list(owner).await.unwrap().is_empty());
        assert!(!stores.blobs.contains(&old.blob_key));
    }

    #[tokio::test]
    async fn test_replace_validates_before_deleting() {
        let stores = TestStores::new();
        let coordinator = stores.coordinator();
        let owner = OwnerRef::report(5);
        let old = coordinator
            .replace_singleton(owner, pdf_upload(100), &report_limits())
            .await
            .unwrap();

        let err = coordinator
            .replace_singleton(owner, photo_upload(100), &report_limits())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(coordinator.list(owner).await.unwrap(), vec![old]);
        assert!(stores.blobs.deleted_keys().is_empty());
    }

    #[tokio::test]
    async fn test_access_url_for_latest_photo() {
        let stores = TestStores::new();
        let evaluation = stores.evaluations.seed(sample_evaluation(1, 10));
        let coordinator = stores.coordinator();
        let owner = OwnerRef::evaluation(evaluation.id);
        coordinator
            .upload(owner, photo_upload(10), &photo_limits())
            .await
            .unwrap();
        let latest = coordinator
            .upload(owner, photo_upload(20), &photo_limits())
            .await
            .unwrap();

        let requester = AuthenticatedUser::new(10, UserRole::User);
        let signed = coordinator
            .get_access_url(owner, &requester, None)
            .await
            .unwrap();

        assert!(signed.url.contains(&latest.blob_key));
        assert!(signed.url.contains("expires=3600"));
        assert!(signed.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_access_url_checks_ownership() {
        let stores = TestStores::new();
        stores.evaluations.seed(sample_evaluation(1, 10));
        stores.reports.seed(sample_report(2, 1, 7));
        let coordinator = stores.coordinator();
        coordinator
            .replace_singleton(OwnerRef::report(2), pdf_upload(10), &report_limits())
            .await
            .unwrap();

        let stranger = AuthenticatedUser::new(99, UserRole::User);
        let err = coordinator
            .get_access_url(OwnerRef::evaluation(1), &stranger, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        // The requester may see photos but not the evaluator's report file
        let requester = AuthenticatedUser::new(10, UserRole::User);
        let err = coordinator
            .get_access_url(OwnerRef::report(2), &requester, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let evaluator = AuthenticatedUser::new(7, UserRole::Evaluator);
        let signed = coordinator
            .get_access_url(OwnerRef::report(2), &evaluator, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(signed.url.contains("expires=60"));
    }

    #[tokio::test]
    async fn test_access_url_not_found_cases() {
        let stores = TestStores::new();
        stores.evaluations.seed(sample_evaluation(1, 10));
        let coordinator = stores.coordinator();
        let requester = AuthenticatedUser::new(10, UserRole::User);

        let missing_owner = coordinator
            .get_access_url(OwnerRef::evaluation(42), &requester, None)
            .await
            .unwrap_err();
        assert!(matches!(missing_owner, AppError::NotFound(_)));

        let no_file = coordinator
            .get_access_url(OwnerRef::evaluation(1), &requester, None)
            .await
            .unwrap_err();
        assert!(matches!(no_file, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_access_url_lifetime_is_clamped_to_store_bounds() {
        let stores = TestStores::new();
        let evaluation = stores.evaluations.seed(sample_evaluation(1, 10));
        let owner = OwnerRef::evaluation(evaluation.id);
        let requester = AuthenticatedUser::new(10, UserRole::User);

        // A configured default past seven days is cut back to seven days
        let coordinator = stores.coordinator_with_url_ttl(Duration::from_secs(30 * 24 * 3600));
        coordinator
            .upload(owner, photo_upload(10), &photo_limits())
            .await
            .unwrap();

        let before = Utc::now();
        let signed = coordinator
            .get_access_url(owner, &requester, None)
            .await
            .unwrap();
        let max = chrono::Duration::seconds(MAX_URL_TTL_SECS as i64);
        assert!(signed.url.contains(&format!("expires={}", MAX_URL_TTL_SECS)));
        assert!(signed.expires_at >= before + max);
        assert!(signed.expires_at <= Utc::now() + max);

        // A zero default still yields a URL that lives for a second
        let coordinator = stores.coordinator_with_url_ttl(Duration::ZERO);
        let signed = coordinator
            .get_access_url(owner, &requester, None)
            .await
            .unwrap();
        assert!(signed.url.ends_with("?expires=1"));
        assert!(signed.expires_at > before);
    }
}
