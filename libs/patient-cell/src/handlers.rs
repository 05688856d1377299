use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::access::{ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::upload::read_file_field;

use crate::models::{CreatePatientRequest, Patient, PatientListQuery, UpdatePatientRequest};
use crate::report::render_patient_report;
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = PatientService::new(&config);
    let patients = service.list_patients(query.search.as_deref()).await?;

    Ok(Json(patients))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    let service = PatientService::new(&config);
    let patient = service.create_patient(request).await?;

    Ok((StatusCode::CREATED, Json(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<Json<Patient>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = PatientService::new(&config);
    let patient = service.get_patient(patient_id).await?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Patient>, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    let service = PatientService::new(&config);
    let patient = service.update_patient(patient_id, request).await?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    PatientService::new(&config).delete_patient(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn upload_document(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<Patient>, AppError> {
    ensure(user.effective_role(), Action::WriteRecords)?;

    let file = read_file_field(&mut multipart, config.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let service = PatientService::new(&config);
    let patient = service
        .upload_document(patient_id, &file.file_name, &file.content_type, file.bytes)
        .await?;

    Ok(Json(patient))
}

#[axum::debug_handler]
pub async fn export_pdf(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = PatientService::new(&config);
    let patient = service.get_patient(patient_id).await?;
    let visits = service.visit_history(patient_id).await?;

    debug!("Exporting {} visits for patient {}", visits.len(), patient_id);
    let pdf = render_patient_report(&config.clinic_name, &patient, &visits)?;

    let disposition = format!(
        "attachment; filename=\"patient_{}.pdf\"",
        patient.reg_no.replace(['"', '\\'], "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}
