use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/auth/login/", post(handlers::login))
        .route("/auth/refresh/", post(handlers::refresh));

    let protected_routes = Router::new()
        .route("/auth/me/", get(handlers::me))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn user_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/users/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/{id}/",
            get(handlers::get_user)
                .put(handlers::update_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
