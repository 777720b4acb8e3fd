use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::attachments::dtos::{
    AccessUrlQuery, AttachmentResponseDto, SignedUrlDto, UploadReportFileDto,
};
use crate::features::attachments::upload::read_file_upload;
use crate::features::auth::guards::RequireEvaluator;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::dtos::{CreateReportDto, ReportResponseDto, UpdateReportDto};
use crate::features::reports::services::ReportService;
use crate::shared::types::ApiResponse;

/// Start a report for an evaluation
///
/// Only the evaluator assigned to the evaluation may do this, once.
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = CreateReportDto,
    responses(
        (status = 201, description = "Report created", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the assigned evaluator"),
        (status = 404, description = "Evaluation not found"),
        (status = 409, description = "Evaluation already has a report")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "reports"
)]
pub async fn create_report(
    RequireEvaluator(user): RequireEvaluator,
    State(service): State<Arc<ReportService>>,
    AppJson(dto): AppJson<CreateReportDto>,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report = service.create(user.user_id, dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(report.into()), None, None)),
    ))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ApiResponse<ReportResponseDto>),
        (status = 403, description = "Not allowed to see this report"),
        (status = 404, description = "Report not found")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "reports"
)]
pub async fn get_report(
    user: AuthenticatedUser,
    State(service): State<Arc<ReportService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = service.get_for(id, &user).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Edit the summary or finalize the report
#[utoipa::path(
    patch,
    path = "/api/reports/{id}",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    request_body = UpdateReportDto,
    responses(
        (status = 200, description = "Report updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the report's evaluator"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report is finalized or was updated concurrently")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "reports"
)]
pub async fn update_report(
    RequireEvaluator(user): RequireEvaluator,
    State(service): State<Arc<ReportService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateReportDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report = service.update(id, user.user_id, dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(report.into()),
        Some("Report updated".to_string()),
        None,
    )))
}

/// Upload the report document
///
/// Accepts multipart/form-data with a `file` field (PDF). Replaces the current document.
#[utoipa::path(
    post,
    path = "/api/reports/{id}/file",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    request_body(
        content = UploadReportFileDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "File stored", body = ApiResponse<AttachmentResponseDto>),
        (status = 400, description = "Invalid file"),
        (status = 403, description = "Not the report's evaluator"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report is finalized"),
        (status = 502, description = "File storage unavailable")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "reports"
)]
pub async fn upload_report_file(
    RequireEvaluator(user): RequireEvaluator,
    State(service): State<Arc<ReportService>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AttachmentResponseDto>>)> {
    let upload = read_file_upload(&mut multipart, "file").await?;
    let file = service.upload_file(id, user.user_id, upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(file.into()), None, None)),
    ))
}

/// Signed download URL for the report document
#[utoipa::path(
    get,
    path = "/api/reports/{id}/file",
    params(
        ("id" = i64, Path, description = "Report ID"),
        AccessUrlQuery
    ),
    responses(
        (status = 200, description = "Signed URL", body = ApiResponse<SignedUrlDto>),
        (status = 403, description = "Not the report's evaluator"),
        (status = 404, description = "Report or file not found")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "reports"
)]
pub async fn get_report_file_url(
    user: AuthenticatedUser,
    State(service): State<Arc<ReportService>>,
    Path(id): Path<i64>,
    Query(query): Query<AccessUrlQuery>,
) -> Result<Json<ApiResponse<SignedUrlDto>>> {
    let signed = service.file_url(id, &user, query.ttl()?).await?;
    Ok(Json(ApiResponse::success(Some(signed.into()), None, None)))
}
