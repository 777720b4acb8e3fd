use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::reports::handlers::{
    create_report, get_report, get_report_file_url, update_report, upload_report_file,
};
use crate::features::reports::services::ReportService;

/// Headroom on top of the file size limit for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the reports feature
pub fn routes(report_service: Arc<ReportService>) -> Router {
    let file_body_limit = report_service.file_limits().max_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/api/reports", post(create_report))
        .route("/api/reports/{id}", get(get_report).patch(update_report))
        .route(
            "/api/reports/{id}/file",
            post(upload_report_file)
                .layer(DefaultBodyLimit::max(file_body_limit))
                .get(get_report_file_url),
        )
        .with_state(report_service)
}
