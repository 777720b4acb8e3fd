use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::evaluations::models::{
    CreateEvaluation, Evaluation, EvaluationStatus, UpdateEvaluation,
};
use crate::shared::types::{default_page, default_page_size, PaginationQuery};
use crate::shared::validation::VEHICLE_PLATE_REGEX;

/// Request DTO for requesting a vehicle evaluation
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEvaluationDto {
    /// City where the vehicle can be inspected
    #[validate(range(min = 1, message = "city_id must be a positive id"))]
    pub city_id: i64,

    #[validate(length(min = 1, max = 80, message = "Vehicle make must be 1-80 characters"))]
    pub vehicle_make: String,

    #[validate(length(min = 1, max = 120, message = "Vehicle model must be 1-120 characters"))]
    pub vehicle_model: String,

    #[validate(range(min = 1900, max = 2100, message = "Vehicle year must be between 1900 and 2100"))]
    pub vehicle_year: Option<i32>,

    /// Uppercase letters and digits, groups separated by single hyphens (e.g., "B-1234-XYZ")
    #[validate(
        length(min = 1, max = 16, message = "Vehicle plate must be 1-16 characters"),
        regex(path = *VEHICLE_PLATE_REGEX, message = "Vehicle plate may only contain uppercase letters, digits and single hyphens")
    )]
    pub vehicle_plate: Option<String>,

    #[validate(length(max = 2000, message = "Notes must not exceed 2000 characters"))]
    pub notes: Option<String>,
}

impl From<CreateEvaluationDto> for CreateEvaluation {
    fn from(dto: CreateEvaluationDto) -> Self {
        Self {
            city_id: dto.city_id,
            vehicle_make: dto.vehicle_make,
            vehicle_model: dto.vehicle_model,
            vehicle_year: dto.vehicle_year,
            vehicle_plate: dto.vehicle_plate,
            notes: dto.notes,
        }
    }
}

/// Request DTO for assigning, progressing or annotating an evaluation.
/// Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateEvaluationDto {
    /// Assign this evaluator; only valid while the evaluation is `created`
    #[validate(range(min = 1, message = "evaluator_id must be a positive id"))]
    pub evaluator_id: Option<i64>,

    pub status: Option<EvaluationStatus>,

    #[validate(length(max = 2000, message = "Notes must not exceed 2000 characters"))]
    pub notes: Option<String>,
}

impl From<UpdateEvaluationDto> for UpdateEvaluation {
    fn from(dto: UpdateEvaluationDto) -> Self {
        Self {
            evaluator_id: dto.evaluator_id,
            status: dto.status,
            notes: dto.notes,
        }
    }
}

/// Response DTO for evaluation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResponseDto {
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
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Evaluation> for EvaluationResponseDto {
    fn from(e: Evaluation) -> Self {
        Self {
            id: e.id,
            requester_id: e.requester_id,
            evaluator_id: e.evaluator_id,
            city_id: e.city_id,
            vehicle_make: e.vehicle_make,
            vehicle_model: e.vehicle_model,
            vehicle_year: e.vehicle_year,
            vehicle_plate: e.vehicle_plate,
            status: e.status,
            notes: e.notes,
            version: e.version,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Query params for listing evaluations
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListEvaluationsQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Exact status match
    #[param(value_type = Option<String>, example = "created")]
    pub status: Option<EvaluationStatus>,
}

impl ListEvaluationsQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.page_size)
    }
}
