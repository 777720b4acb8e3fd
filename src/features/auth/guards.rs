//! Authorization predicates for evaluations and reports.
//!
//! Predicates are pure functions over entities that were already loaded by the
//! caller. Lifecycle services call the `ensure_*` wrappers before any write;
//! a failed check is always an `Unauthorized` error.
//!
//! Who may do what:
//! - requester: owns the evaluation, may assign, cancel, annotate, add photos
//! - assigned evaluator: progresses the evaluation, owns its report
//! - evaluator role: may assign themselves to an open evaluation
//! - admin: may act on any evaluation (never on someone else's report)

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::evaluations::models::Evaluation;
use crate::features::reports::models::Report;

/// Entities that carry an evaluator assignment
pub trait HasEvaluator {
    fn assigned_evaluator(&self) -> Option<i64>;
}

impl HasEvaluator for Evaluation {
    fn assigned_evaluator(&self) -> Option<i64> {
        self.evaluator_id
    }
}

impl HasEvaluator for Report {
    fn assigned_evaluator(&self) -> Option<i64> {
        Some(self.evaluator_id)
    }
}

pub fn is_requester(actor_id: i64, evaluation: &Evaluation) -> bool {
    evaluation.requester_id == actor_id
}

pub fn is_assigned_evaluator<T: HasEvaluator>(actor_id: i64, entity: &T) -> bool {
    entity.assigned_evaluator() == Some(actor_id)
}

pub fn has_evaluator_role(user: &AuthenticatedUser) -> bool {
    user.is_evaluator()
}

/// Requester, assigned evaluator or admin
pub fn can_access_evaluation(user: &AuthenticatedUser, evaluation: &Evaluation) -> bool {
    user.is_admin()
        || is_requester(user.user_id, evaluation)
        || is_assigned_evaluator(user.user_id, evaluation)
}

/// Assignment is open to the requester, an admin, or an evaluator taking the job themselves
pub fn can_assign_evaluator(
    user: &AuthenticatedUser,
    evaluation: &Evaluation,
    evaluator_id: i64,
) -> bool {
    user.is_admin()
        || is_requester(user.user_id, evaluation)
        || (has_evaluator_role(user) && evaluator_id == user.user_id)
}

pub fn ensure_can_access_evaluation(
    user: &AuthenticatedUser,
    evaluation: &Evaluation,
) -> Result<()> {
    if can_access_evaluation(user, evaluation) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "user {} has no access to evaluation {}",
            user.user_id, evaluation.id
        )))
    }
}

pub fn ensure_can_assign_evaluator(
    user: &AuthenticatedUser,
    evaluation: &Evaluation,
    evaluator_id: i64,
) -> Result<()> {
    if can_assign_evaluator(user, evaluation, evaluator_id) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "user {} may not assign evaluator {} to evaluation {}",
            user.user_id, evaluator_id, evaluation.id
        )))
    }
}

/// Only the evaluator assigned to `entity` passes
pub fn ensure_assigned_evaluator<T: HasEvaluator>(actor_id: i64, entity: &T) -> Result<()> {
    if is_assigned_evaluator(actor_id, entity) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "only the assigned evaluator can perform this action".to_string(),
        ))
    }
}

/// Guard for routes reserved to evaluators.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireEvaluator(user): RequireEvaluator) { ... }
/// ```
pub struct RequireEvaluator(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireEvaluator
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Auth("User not authenticated".to_string()))?;

        if !has_evaluator_role(user) {
            return Err(AppError::Unauthorized(
                "Evaluator access required".to_string(),
            ));
        }

        Ok(RequireEvaluator(user.clone()))
    }
}
