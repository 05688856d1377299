use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::access::{ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::upload::read_file_field;

use crate::models::{
    AttachmentUploaded, CreateVisitRequest, UpdateVisitRequest, Visit, VisitAttachment, VisitListQuery,
};
use crate::services::{AttachmentService, VisitService};

#[axum::debug_handler]
pub async fn list_visits(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<VisitListQuery>,
) -> Result<Json<Vec<Visit>>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = VisitService::new(&config);
    let visits = service.list_visits(query.patient_id).await?;

    Ok(Json(visits))
}

#[axum::debug_handler]
pub async fn create_visit(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateVisitRequest>,
) -> Result<(StatusCode, Json<Visit>), AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;
    if request.is_paid {
        ensure(user.effective_role(), Action::RecordPayment)?;
    }

    debug!("User {} opening visit for patient {}", user.id, request.patient_id);

    let service = VisitService::new(&config);
    let visit = service.create_visit(request, &user).await?;

    Ok((StatusCode::CREATED, Json(visit)))
}

#[axum::debug_handler]
pub async fn get_visit(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Visit>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = VisitService::new(&config);
    let visit = service.get_visit(visit_id).await?;

    Ok(Json(visit))
}

#[axum::debug_handler]
pub async fn update_visit(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
    Json(request): Json<UpdateVisitRequest>,
) -> Result<Json<Visit>, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    let service = VisitService::new(&config);
    let visit = service.update_visit(visit_id, request).await?;

    Ok(Json(visit))
}

#[axum::debug_handler]
pub async fn delete_visit(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    VisitService::new(&config).delete_visit(visit_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn upload_attachment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentUploaded>, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    let file = read_file_field(&mut multipart, config.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let service = AttachmentService::new(&config);
    let attachment = service.upload(visit_id, file, user.id).await?;

    Ok(Json(AttachmentUploaded {
        status: "success",
        attachment,
    }))
}

#[axum::debug_handler]
pub async fn list_attachments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
) -> Result<Json<Vec<VisitAttachment>>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = AttachmentService::new(&config);
    let attachments = service.list(visit_id).await?;

    Ok(Json(attachments))
}
