use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

// headroom for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn patient_routes(config: Arc<AppConfig>) -> Router {
    let upload_limit = DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route("/patients/", get(list_patients).post(create_patient))
        .route(
            "/patients/{id}/",
            get(get_patient)
                .put(update_patient)
                .patch(update_patient)
                .delete(delete_patient),
        )
        .route("/patients/{id}/upload_document/", post(upload_document).layer(upload_limit))
        .route("/patients/{id}/export-pdf/", get(export_pdf))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
