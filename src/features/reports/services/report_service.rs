use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{
    Attachment, FileUpload, OwnerRef, SignedUrl, UploadLimits,
};
use crate::features::attachments::AttachmentCoordinator;
use crate::features::auth::guards::{can_access_evaluation, ensure_assigned_evaluator};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::evaluations::repositories::EvaluationRepository;
use crate::features::reports::models::{CreateReport, Report, ReportStatus, UpdateReport};
use crate::features::reports::repositories::ReportRepository;
use crate::shared::status::StatusTransitions;

/// Report lifecycle. Every write is reserved to the evaluator assigned to the
/// evaluation; a finalized report no longer changes.
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
    evaluations: Arc<dyn EvaluationRepository>,
    attachments: Arc<AttachmentCoordinator>,
    file_limits: UploadLimits,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        evaluations: Arc<dyn EvaluationRepository>,
        attachments: Arc<AttachmentCoordinator>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            reports,
            evaluations,
            attachments,
            file_limits: UploadLimits::report_files(uploads.report_file_max_size_bytes),
        }
    }

    pub fn file_limits(&self) -> UploadLimits {
        self.file_limits
    }

    pub async fn create(&self, evaluator_id: i64, data: CreateReport) -> Result<Report> {
        let evaluation = self
            .evaluations
            .find_by_id(data.evaluation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Evaluation with id {} not found",
                    data.evaluation_id
                ))
            })?;

        ensure_assigned_evaluator(evaluator_id, &evaluation)?;

        if self
            .reports
            .find_by_evaluation_id(evaluation.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "a report already exists for evaluation {}",
                evaluation.id
            )));
        }

        // The unique index still catches a concurrent create
        let report = self
            .reports
            .insert(evaluation.id, evaluator_id, data.summary.as_deref())
            .await?;

        info!(
            "Report created: id={}, evaluation={}, evaluator={}",
            report.id, report.evaluation_id, report.evaluator_id
        );
        Ok(report)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Report> {
        self.reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report with id {} not found", id)))
    }

    /// Readable by its evaluator and by anyone who may see the evaluation
    pub async fn get_for(&self, id: i64, actor: &AuthenticatedUser) -> Result<Report> {
        let report = self.get_by_id(id).await?;
        if report.evaluator_id == actor.user_id {
            return Ok(report);
        }

        let evaluation = self.evaluations.find_by_id(report.evaluation_id).await?;
        match evaluation {
            Some(evaluation) if can_access_evaluation(actor, &evaluation) => Ok(report),
            _ => Err(AppError::Unauthorized(format!(
                "user {} has no access to report {}",
                actor.user_id, id
            ))),
        }
    }

    /// Load a report the evaluator may still change
    async fn load_draft(&self, id: i64, evaluator_id: i64) -> Result<Report> {
        let report = self.get_by_id(id).await?;
        ensure_assigned_evaluator(evaluator_id, &report)?;

        if report.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "report {} is {} and can no longer change",
                id, report.status
            )));
        }

        Ok(report)
    }

    pub async fn update(&self, id: i64, evaluator_id: i64, patch: UpdateReport) -> Result<Report> {
        let current = self.load_draft(id, evaluator_id).await?;

        let mut next = current.clone();
        if let Some(summary) = patch.summary {
            next.summary = Some(summary);
        }
        if let Some(status) = patch.status {
            next.status = next.status.transition_to(status)?;
        }

        if next == current {
            return Ok(current);
        }

        let updated = self.reports.update(&next).await?.ok_or_else(|| {
            AppError::Conflict(format!(
                "Report {} was modified concurrently, reload and retry",
                id
            ))
        })?;

        if updated.status == ReportStatus::Finalized {
            info!("Report finalized: id={}, evaluator={}", id, evaluator_id);
        } else {
            info!("Report updated: id={}, evaluator={}", id, evaluator_id);
        }
        Ok(updated)
    }

    /// Store the report document, replacing any previous one
    pub async fn upload_file(
        &self,
        id: i64,
        evaluator_id: i64,
        upload: FileUpload,
    ) -> Result<Attachment> {
        self.load_draft(id, evaluator_id).await?;

        self.attachments
            .replace_singleton(OwnerRef::report(id), upload, &self.file_limits)
            .await
    }

    /// Signed URL for the report document
    pub async fn file_url(
        &self,
        id: i64,
        actor: &AuthenticatedUser,
        ttl: Option<Duration>,
    ) -> Result<SignedUrl> {
        self.attachments
            .get_access_url(OwnerRef::report(id), actor, ttl)
            .await
    }
}
