use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    CreateUserRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
    UpdateUserRequest, UserProfile,
};
use crate::services::{SessionService, UserService};

// ==============================================================================
// SESSION
// ==============================================================================

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    debug!("Login attempt");

    let response = SessionService::new(&config)
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(response))
}

pub async fn refresh(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let response = SessionService::new(&config).refresh(&request.refresh).await?;
    Ok(Json(response))
}

pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserProfile>, AppError> {
    let row = UserService::new(&config).get(user.id).await?;
    Ok(Json(UserProfile::from(&row)))
}

// ==============================================================================
// USER ACCOUNTS
// ==============================================================================

pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let rows = UserService::new(&config).list(&user).await?;
    Ok(Json(rows.iter().map(UserProfile::from).collect()))
}

pub async fn get_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserProfile>, AppError> {
    let row = UserService::new(&config).get_for(&user, id).await?;
    Ok(Json(UserProfile::from(&row)))
}

pub async fn create_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let row = UserService::new(&config).create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&row))))
}

pub async fn update_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let row = UserService::new(&config).update(&user, id, request).await?;
    Ok(Json(UserProfile::from(&row)))
}

pub async fn delete_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    UserService::new(&config).delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
