use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::attachments::models::{
    Attachment, FileUpload, OwnerRef, SignedUrl, UploadLimits,
};
use crate::features::attachments::AttachmentCoordinator;
use crate::features::auth::guards::{ensure_can_access_evaluation, ensure_can_assign_evaluator};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::evaluations::models::{
    CreateEvaluation, Evaluation, EvaluationStatus, UpdateEvaluation,
};
use crate::features::evaluations::repositories::EvaluationRepository;
use crate::shared::status::StatusTransitions;
use crate::shared::types::PaginationQuery;

/// Apply a patch to a loaded evaluation without touching storage.
///
/// Assignment goes first and can only move `created` to `accepted`; an explicit
/// status is then checked from wherever assignment left the evaluation, and
/// alongside an assignment only a cancel is accepted.
pub fn apply_patch(current: &Evaluation, patch: UpdateEvaluation) -> Result<Evaluation> {
    if current.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "evaluation {} is {} and can no longer change",
            current.id, current.status
        )));
    }

    let mut next = current.clone();

    if let Some(evaluator_id) = patch.evaluator_id {
        if next.status != EvaluationStatus::Created {
            return Err(AppError::InvalidTransition(format!(
                "an evaluator can only be assigned while the evaluation is '{}', it is '{}'",
                EvaluationStatus::Created,
                next.status
            )));
        }
        next.status = next.status.transition_to(EvaluationStatus::Accepted)?;
        next.evaluator_id = Some(evaluator_id);
    }

    if let Some(status) = patch.status {
        next.status = next.status.transition_to(status)?;

        // Assigning only ever lands on accepted; canceling in the same patch is fine
        if patch.evaluator_id.is_some() && next.status != EvaluationStatus::Canceled {
            return Err(AppError::InvalidTransition(format!(
                "cannot assign an evaluator and move evaluation {} to '{}' in one update",
                current.id, next.status
            )));
        }
    }

    if let Some(notes) = patch.notes {
        next.notes = Some(notes);
    }

    Ok(next)
}

/// Evaluation lifecycle: creation, assignment, status changes and photos
pub struct EvaluationService {
    evaluations: Arc<dyn EvaluationRepository>,
    attachments: Arc<AttachmentCoordinator>,
    photo_limits: UploadLimits,
}

impl EvaluationService {
    pub fn new(
        evaluations: Arc<dyn EvaluationRepository>,
        attachments: Arc<AttachmentCoordinator>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            evaluations,
            attachments,
            photo_limits: UploadLimits::photos(uploads.photo_max_size_bytes),
        }
    }

    pub fn photo_limits(&self) -> UploadLimits {
        self.photo_limits
    }

    pub async fn create(&self, requester_id: i64, data: CreateEvaluation) -> Result<Evaluation> {
        let evaluation = self.evaluations.insert(requester_id, &data).await?;

        info!(
            "Evaluation created: id={}, requester={}",
            evaluation.id, evaluation.requester_id
        );
        Ok(evaluation)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Evaluation> {
        self.evaluations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Evaluation with id {} not found", id)))
    }

    /// Newest first, with the total number of matching evaluations
    pub async fn list(
        &self,
        status: Option<EvaluationStatus>,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Evaluation>, i64)> {
        let items = self
            .evaluations
            .list(status, pagination.limit(), pagination.offset())
            .await?;
        let total = self.evaluations.count(status).await?;

        Ok((items, total))
    }

    pub async fn update(
        &self,
        id: i64,
        actor: &AuthenticatedUser,
        patch: UpdateEvaluation,
    ) -> Result<Evaluation> {
        let current = self.get_by_id(id).await?;

        match patch.evaluator_id {
            Some(evaluator_id) => ensure_can_assign_evaluator(actor, &current, evaluator_id)?,
            None => ensure_can_access_evaluation(actor, &current)?,
        }

        let next = apply_patch(&current, patch)?;
        if next == current {
            return Ok(current);
        }

        let updated = self.evaluations.update(&next).await?.ok_or_else(|| {
            AppError::Conflict(format!(
                "Evaluation {} was modified concurrently, reload and retry",
                id
            ))
        })?;

        info!(
            "Evaluation updated: id={}, status={} -> {}, evaluator={:?}, by={}",
            id, current.status, updated.status, updated.evaluator_id, actor.user_id
        );
        Ok(updated)
    }

    /// Load an evaluation the actor may see
    async fn load_for(&self, id: i64, actor: &AuthenticatedUser) -> Result<Evaluation> {
        let evaluation = self.get_by_id(id).await?;
        ensure_can_access_evaluation(actor, &evaluation)?;
        Ok(evaluation)
    }

    pub async fn upload_photo(
        &self,
        id: i64,
        actor: &AuthenticatedUser,
        upload: FileUpload,
    ) -> Result<Attachment> {
        let evaluation = self.load_for(id, actor).await?;
        if evaluation.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "evaluation {} is {} and no longer accepts photos",
                id, evaluation.status
            )));
        }

        self.attachments
            .upload(OwnerRef::evaluation(id), upload, &self.photo_limits)
            .await
    }

    /// Photos of the evaluation, newest first
    pub async fn list_photos(&self, id: i64, actor: &AuthenticatedUser) -> Result<Vec<Attachment>> {
        self.load_for(id, actor).await?;
        self.attachments.list(OwnerRef::evaluation(id)).await
    }

    /// Signed URL for the most recent photo
    pub async fn photo_url(
        &self,
        id: i64,
        actor: &AuthenticatedUser,
        ttl: Option<Duration>,
    ) -> Result<SignedUrl> {
        self.attachments
            .get_access_url(OwnerRef::evaluation(id), actor, ttl)
            .await
    }
}
