use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::attachments::{dtos as attachments_dtos, models as attachments_models};
use crate::features::evaluations::{
    dtos as evaluations_dtos, handlers as evaluations_handlers, models as evaluations_models,
};
use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::shared::constants::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Evaluations
        evaluations_handlers::create_evaluation,
        evaluations_handlers::list_evaluations,
        evaluations_handlers::get_evaluation,
        evaluations_handlers::update_evaluation,
        evaluations_handlers::upload_photo,
        evaluations_handlers::list_photos,
        evaluations_handlers::get_photo_url,
        // Reports
        reports_handlers::create_report,
        reports_handlers::get_report,
        reports_handlers::update_report,
        reports_handlers::upload_report_file,
        reports_handlers::get_report_file_url,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Attachments
            attachments_models::OwnerKind,
            attachments_dtos::AttachmentResponseDto,
            attachments_dtos::SignedUrlDto,
            attachments_dtos::UploadPhotoDto,
            attachments_dtos::UploadReportFileDto,
            ApiResponse<attachments_dtos::AttachmentResponseDto>,
            ApiResponse<Vec<attachments_dtos::AttachmentResponseDto>>,
            ApiResponse<attachments_dtos::SignedUrlDto>,
            // Evaluations
            evaluations_models::EvaluationStatus,
            evaluations_dtos::CreateEvaluationDto,
            evaluations_dtos::UpdateEvaluationDto,
            evaluations_dtos::EvaluationResponseDto,
            ApiResponse<evaluations_dtos::EvaluationResponseDto>,
            ApiResponse<Vec<evaluations_dtos::EvaluationResponseDto>>,
            // Reports
            reports_models::ReportStatus,
            reports_dtos::CreateReportDto,
            reports_dtos::UpdateReportDto,
            reports_dtos::ReportResponseDto,
            ApiResponse<reports_dtos::ReportResponseDto>,
        )
    ),
    tags(
        (name = "evaluations", description = "Vehicle evaluation requests and their photos"),
        (name = "reports", description = "Evaluator reports and report documents"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Vehicle Evaluations API",
        version = "0.1.0",
        description = "API documentation for the vehicle evaluation service",
    )
)]
pub struct ApiDoc;

/// Documents the identity headers set by the gateway
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    USER_ID_HEADER,
                    "Numeric id of the caller",
                ))),
            );
            components.add_security_scheme(
                "user_role",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    USER_ROLE_HEADER,
                    "user, evaluator or admin (defaults to user)",
                ))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
