use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

use crate::shared::status::StatusTransitions;

/// Evaluation status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "evaluation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Created,
    Accepted,
    InProgress,
    Completed,
    Canceled,
}

impl EvaluationStatus {
    #[cfg(test)]
    pub const ALL: [EvaluationStatus; 5] = [
        EvaluationStatus::Created,
        EvaluationStatus::Accepted,
        EvaluationStatus::InProgress,
        EvaluationStatus::Completed,
        EvaluationStatus::Canceled,
    ];
}

impl StatusTransitions for EvaluationStatus {
    const TRANSITIONS: &'static [(Self, &'static [Self])] = &[
        (Self::Created, &[Self::Accepted, Self::Canceled]),
        (Self::Accepted, &[Self::InProgress, Self::Canceled]),
        (Self::InProgress, &[Self::Completed, Self::Canceled]),
        (Self::Completed, &[]),
        (Self::Canceled, &[]),
    ];
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationStatus::Created => write!(f, "created"),
            EvaluationStatus::Accepted => write!(f, "accepted"),
            EvaluationStatus::InProgress => write!(f, "in_progress"),
            EvaluationStatus::Completed => write!(f, "completed"),
            EvaluationStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Database model for evaluation
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub requester_id: i64,
    pub evaluator_id: Option<i64>,
    pub city_id: i64,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: Option<i32>,
    pub vehicle_plate: Option<String>,
    pub status: EvaluationStatus,
    pub notes: Option<String>,
    /// Bumped on every write, used for optimistic concurrency
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new evaluation
#[derive(Debug, Clone)]
pub struct CreateEvaluation {
    pub city_id: i64,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: Option<i32>,
    pub vehicle_plate: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of an evaluation. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateEvaluation {
    pub evaluator_id: Option<i64>,
    pub status: Option<EvaluationStatus>,
    pub notes: Option<String>,
}
