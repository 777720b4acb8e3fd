use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::reports::models::{CreateReport, Report, ReportStatus, UpdateReport};

/// Request DTO for starting a report on an evaluation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReportDto {
    #[validate(range(min = 1, message = "evaluation_id must be a positive id"))]
    pub evaluation_id: i64,

    #[validate(length(max = 255, message = "Summary must not exceed 255 characters"))]
    pub summary: Option<String>,
}

impl From<CreateReportDto> for CreateReport {
    fn from(dto: CreateReportDto) -> Self {
        Self {
            evaluation_id: dto.evaluation_id,
            summary: dto.summary,
        }
    }
}

/// Request DTO for editing or finalizing a report
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateReportDto {
    #[validate(length(max = 255, message = "Summary must not exceed 255 characters"))]
    pub summary: Option<String>,

    /// Only `finalized` is accepted, and only once
    pub status: Option<ReportStatus>,
}

impl From<UpdateReportDto> for UpdateReport {
    fn from(dto: UpdateReportDto) -> Self {
        Self {
            summary: dto.summary,
            status: dto.status,
        }
    }
}

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: i64,
    pub evaluation_id: i64,
    pub evaluator_id: i64,
    pub summary: Option<String>,
    pub status: ReportStatus,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            evaluation_id: r.evaluation_id,
            evaluator_id: r.evaluator_id,
            summary: r.summary,
            status: r.status,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_length_limit() {
        let dto = CreateReportDto {
            evaluation_id: 1,
            summary: Some("x".repeat(255)),
        };
        assert!(dto.validate().is_ok());

        let dto = UpdateReportDto {
            summary: Some("x".repeat(256)),
            status: None,
        };
        assert!(dto.validate().is_err());
    }
}
