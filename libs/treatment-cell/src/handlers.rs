use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::access::{ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{NewTreatment, Treatment, UpdateTreatmentRequest};
use crate::services::TreatmentService;

pub async fn list_treatments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Treatment>>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;
    Ok(Json(TreatmentService::new(&config).list().await?))
}

pub async fn get_treatment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<Json<Treatment>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;
    Ok(Json(TreatmentService::new(&config).get(id).await?))
}

pub async fn create_treatment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<NewTreatment>,
) -> Result<(StatusCode, Json<Treatment>), AppError> {
    ensure(user.effective_role(), Action::ManageCatalog)?;

    let treatment = TreatmentService::new(&config).create(request).await?;
    Ok((StatusCode::CREATED, Json(treatment)))
}

pub async fn update_treatment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTreatmentRequest>,
) -> Result<Json<Treatment>, AppError> {
    ensure(user.effective_role(), Action::ManageCatalog)?;
    Ok(Json(TreatmentService::new(&config).update(id, request).await?))
}

pub async fn delete_treatment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ensure(user.effective_role(), Action::ManageCatalog)?;

    TreatmentService::new(&config).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
