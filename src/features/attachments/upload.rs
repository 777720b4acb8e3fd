use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::attachments::models::FileUpload;

/// Read the file part named `field_name` from a multipart body.
///
/// Other fields are skipped. The declared content type and filename are kept as
/// sent; validation happens in the coordinator.
pub async fn read_file_upload(multipart: &mut Multipart, field_name: &str) -> Result<FileUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart data"))?
    {
        if field.name() != Some(field_name) {
            debug!("Ignoring unknown field: {}", field.name().unwrap_or(""));
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let filename = field.file_name().map(|s| s.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "file data"))?;

        return Ok(FileUpload {
            data: data.to_vec(),
            content_type,
            filename,
        });
    }

    Err(AppError::BadRequest(format!(
        "Multipart field '{}' is required",
        field_name
    )))
}

/// A body cut off by the route's size limit is an oversized file, anything else
/// is a malformed request
fn multipart_error(err: MultipartError, what: &str) -> AppError {
    debug!("Failed to read {}: {}", what, err);

    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(format!("File exceeds the maximum allowed size: {}", err))
    } else {
        AppError::BadRequest(format!("Failed to read {}: {}", what, err))
    }
}
