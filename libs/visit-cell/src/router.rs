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

/// Payment and bill routes under `/visits/{id}/` belong to the billing cell.
pub fn visit_routes(config: Arc<AppConfig>) -> Router {
    let upload_limit = DefaultBodyLimit::max(config.max_upload_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route("/visits/", get(list_visits).post(create_visit))
        .route(
            "/visits/{id}/",
            get(get_visit)
                .put(update_visit)
                .patch(update_visit)
                .delete(delete_visit),
        )
        .route("/visits/{id}/upload_attachment/", post(upload_attachment).layer(upload_limit))
        .route("/visits/{id}/attachments/", get(list_attachments))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
