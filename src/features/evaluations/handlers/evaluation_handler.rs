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
    AccessUrlQuery, AttachmentResponseDto, SignedUrlDto, UploadPhotoDto,
};
use crate::features::attachments::upload::read_file_upload;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::evaluations::dtos::{
    CreateEvaluationDto, EvaluationResponseDto, ListEvaluationsQuery, UpdateEvaluationDto,
};
use crate::features::evaluations::services::EvaluationService;
use crate::shared::types::{ApiResponse, Meta};

/// Request a vehicle evaluation
///
/// The caller becomes the requester. The evaluation starts in `created`.
#[utoipa::path(
    post,
    path = "/api/evaluations",
    request_body = CreateEvaluationDto,
    responses(
        (status = 201, description = "Evaluation created", body = ApiResponse<EvaluationResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing identity")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn create_evaluation(
    user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    AppJson(dto): AppJson<CreateEvaluationDto>,
) -> Result<(StatusCode, Json<ApiResponse<EvaluationResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let evaluation = service.create(user.user_id, dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(evaluation.into()), None, None)),
    ))
}

/// List evaluations (paginated, newest first)
#[utoipa::path(
    get,
    path = "/api/evaluations",
    params(ListEvaluationsQuery),
    responses(
        (status = 200, description = "List of evaluations", body = ApiResponse<Vec<EvaluationResponseDto>>),
        (status = 401, description = "Missing identity")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn list_evaluations(
    _user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Query(query): Query<ListEvaluationsQuery>,
) -> Result<Json<ApiResponse<Vec<EvaluationResponseDto>>>> {
    let (items, total) = service.list(query.status, &query.pagination()).await?;
    let items = items.into_iter().map(EvaluationResponseDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Get evaluation by ID
#[utoipa::path(
    get,
    path = "/api/evaluations/{id}",
    params(
        ("id" = i64, Path, description = "Evaluation ID")
    ),
    responses(
        (status = 200, description = "Evaluation found", body = ApiResponse<EvaluationResponseDto>),
        (status = 404, description = "Evaluation not found")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn get_evaluation(
    _user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EvaluationResponseDto>>> {
    let evaluation = service.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(Some(evaluation.into()), None, None)))
}

/// Assign an evaluator, change status or edit notes
///
/// Assigning an evaluator is only possible while the evaluation is `created`
/// and moves it to `accepted`.
#[utoipa::path(
    patch,
    path = "/api/evaluations/{id}",
    params(
        ("id" = i64, Path, description = "Evaluation ID")
    ),
    request_body = UpdateEvaluationDto,
    responses(
        (status = 200, description = "Evaluation updated", body = ApiResponse<EvaluationResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not allowed to change this evaluation"),
        (status = 404, description = "Evaluation not found"),
        (status = 409, description = "Status change not allowed or concurrent update")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn update_evaluation(
    user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Path(id): Path<i64>,
    AppJson(dto): AppJson<UpdateEvaluationDto>,
) -> Result<Json<ApiResponse<EvaluationResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let evaluation = service.update(id, &user, dto.into()).await?;
    Ok(Json(ApiResponse::success(
        Some(evaluation.into()),
        Some("Evaluation updated".to_string()),
        None,
    )))
}

/// Upload a photo of the vehicle
///
/// Accepts multipart/form-data with a `photo` field (JPEG, PNG, GIF or WebP).
#[utoipa::path(
    post,
    path = "/api/evaluations/{id}/photos",
    params(
        ("id" = i64, Path, description = "Evaluation ID")
    ),
    request_body(
        content = UploadPhotoDto,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Photo uploaded", body = ApiResponse<AttachmentResponseDto>),
        (status = 400, description = "Invalid file"),
        (status = 403, description = "Not allowed to add photos"),
        (status = 404, description = "Evaluation not found"),
        (status = 409, description = "Evaluation is closed"),
        (status = 502, description = "File storage unavailable")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn upload_photo(
    user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AttachmentResponseDto>>)> {
    let upload = read_file_upload(&mut multipart, "photo").await?;
    let photo = service.upload_photo(id, &user, upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(photo.into()), None, None)),
    ))
}

/// List photos of an evaluation, newest first
#[utoipa::path(
    get,
    path = "/api/evaluations/{id}/photos",
    params(
        ("id" = i64, Path, description = "Evaluation ID")
    ),
    responses(
        (status = 200, description = "Photos", body = ApiResponse<Vec<AttachmentResponseDto>>),
        (status = 403, description = "Not allowed to see this evaluation"),
        (status = 404, description = "Evaluation not found")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn list_photos(
    user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<AttachmentResponseDto>>>> {
    let photos = service.list_photos(id, &user).await?;
    let total = photos.len() as i64;
    let photos = photos.into_iter().map(AttachmentResponseDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(photos),
        None,
        Some(Meta { total }),
    )))
}

/// Signed download URL for the latest photo
#[utoipa::path(
    get,
    path = "/api/evaluations/{id}/photos/url",
    params(
        ("id" = i64, Path, description = "Evaluation ID"),
        AccessUrlQuery
    ),
    responses(
        (status = 200, description = "Signed URL", body = ApiResponse<SignedUrlDto>),
        (status = 403, description = "Not allowed to see this evaluation"),
        (status = 404, description = "Evaluation or photo not found")
    ),
    security(("user_id" = [], "user_role" = [])),
    tag = "evaluations"
)]
pub async fn get_photo_url(
    user: AuthenticatedUser,
    State(service): State<Arc<EvaluationService>>,
    Path(id): Path<i64>,
    Query(query): Query<AccessUrlQuery>,
) -> Result<Json<ApiResponse<SignedUrlDto>>> {
    let signed = service.photo_url(id, &user, query.ttl()?).await?;
    Ok(Json(ApiResponse::success(Some(signed.into()), None, None)))
}
