use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use auth_cell::{auth_routes, user_routes};
use billing_cell::billing_routes;
use dashboard_cell::dashboard_routes;
use patient_cell::patient_routes;
use shared_config::AppConfig;
use treatment_cell::treatment_routes;
use visit_cell::visit_routes;

/// Every cell carries its own resource prefix; they all live under `/api`.
pub fn create_router(state: Arc<AppConfig>) -> Router {
    let api = Router::new()
        .merge(auth_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(patient_routes(state.clone()))
        .merge(treatment_routes(state.clone()))
        .merge(visit_routes(state.clone()))
        .merge(billing_routes(state.clone()))
        .merge(dashboard_routes(state));

    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/api", api)
}
