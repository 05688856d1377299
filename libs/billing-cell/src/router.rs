use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

/// Bill endpoints hang off a visit.
pub fn billing_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/visits/{id}/add_payment/", post(add_payment))
        .route("/visits/{id}/bill/", get(get_bill))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
