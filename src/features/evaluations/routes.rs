use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::evaluations::handlers::{
    create_evaluation, get_evaluation, get_photo_url, list_evaluations, list_photos,
    update_evaluation, upload_photo,
};
use crate::features::evaluations::services::EvaluationService;

/// Headroom on top of the photo size limit for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the evaluations feature
pub fn routes(evaluation_service: Arc<EvaluationService>) -> Router {
    let photo_body_limit = evaluation_service.photo_limits().max_size + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/api/evaluations",
            post(create_evaluation).get(list_evaluations),
        )
        .route(
            "/api/evaluations/{id}",
            get(get_evaluation).patch(update_evaluation),
        )
        .route(
            "/api/evaluations/{id}/photos",
            post(upload_photo)
                .layer(DefaultBodyLimit::max(photo_body_limit))
                .get(list_photos),
        )
        .route("/api/evaluations/{id}/photos/url", get(get_photo_url))
        .with_state(evaluation_service)
}
