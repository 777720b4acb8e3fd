use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

use crate::shared::status::StatusTransitions;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Finalized,
}

impl StatusTransitions for ReportStatus {
    const TRANSITIONS: &'static [(Self, &'static [Self])] =
        &[(Self::Draft, &[Self::Finalized]), (Self::Finalized, &[])];
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Draft => write!(f, "draft"),
            ReportStatus::Finalized => write!(f, "finalized"),
        }
    }
}

/// Database model for report
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Report {
    pub id: i64,
    pub evaluation_id: i64,
    pub evaluator_id: i64,
    pub summary: Option<String>,
    pub status: ReportStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new report
#[derive(Debug, Clone)]
pub struct CreateReport {
    pub evaluation_id: i64,
    pub summary: Option<String>,
}

/// Partial update of a report
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub summary: Option<String>,
    pub status: Option<ReportStatus>,
}
