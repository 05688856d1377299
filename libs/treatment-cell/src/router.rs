use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn treatment_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/treatments/", get(list_treatments).post(create_treatment))
        .route(
            "/treatments/{id}/",
            get(get_treatment)
                .put(update_treatment)
                .patch(update_treatment)
                .delete(delete_treatment),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
