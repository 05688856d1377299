use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SequenceGenerator, SupabaseClient};
use shared_models::error::AppError;
use shared_utils::clock::{clinic_today, clinic_year};
use shared_utils::upload::sanitize_file_name;

use crate::models::{
    check_age, check_blood_group, check_mobile, search_term, CreatePatientRequest, Patient,
    PatientError, UpdatePatientRequest, VisitHistoryRow,
};

const PATIENT_SCOPE: &str = "patient";

pub struct PatientService {
    supabase: SupabaseClient,
    registration_prefix: String,
    bucket: String,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            registration_prefix: config.registration_prefix.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, AppError> {
        request.validate()?;
        let blood_group = check_blood_group(request.blood_group.as_deref())?;

        // Anything the store rejects past validation is reported as a 400.
        self.insert_patient(request, blood_group)
            .await
            .map_err(|e| {
                error!("Patient registration failed: {}", e);
                PatientError::Store(e.to_string()).into()
            })
    }

    async fn insert_patient(
        &self,
        request: CreatePatientRequest,
        blood_group: Option<String>,
    ) -> Result<Patient, DbError> {
        let first_visit_date = request.first_visit_date.unwrap_or_else(clinic_today);

        let reg_no = match request.reg_no.as_deref().map(str::trim) {
            Some(supplied) => supplied.to_string(),
            None => SequenceGenerator::new(&self.supabase)
                .next_code(PATIENT_SCOPE, &self.registration_prefix, clinic_year())
                .await?,
        };

        debug!("Registering patient {} as {}", request.name.trim(), reg_no);

        let body = json!({
            "name": request.name.trim(),
            "mobile": request.mobile.trim(),
            "alt_mobile": request.alt_mobile.filter(|m| !m.trim().is_empty()),
            "age": request.age,
            "sex": request.sex,
            "address": request.address,
            "reg_no": reg_no,
            "first_visit_date": first_visit_date,
            "blood_group": blood_group,
        });

        let rows: Vec<Patient> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let patient = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::Decode("Patient insert returned no row".to_string()))?;

        info!("Registered patient {} ({})", patient.id, patient.reg_no);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Patient, AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows: Vec<Patient> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| PatientError::NotFound(patient_id).into())
    }

    /// Newest first; `search` matches name, mobile or registration number.
    pub async fn list_patients(&self, search: Option<&str>) -> Result<Vec<Patient>, AppError> {
        let mut path = "/rest/v1/patients?order=id.desc".to_string();

        if let Some(term) = search.and_then(search_term) {
            let filter = format!(
                "(name.ilike.*{0}*,mobile.ilike.*{0}*,reg_no.ilike.*{0}*)",
                term
            );
            path.push_str("&or=");
            path.push_str(&urlencoding::encode(&filter));
        }

        debug!("Listing patients: {}", path);
        let patients: Vec<Patient> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, AppError> {
        let mut update_data = Map::new();

        if let Some(name) = request.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(PatientError::InvalidField("name is required".into()).into());
            }
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(mobile) = request.mobile {
            check_mobile("mobile", &mobile)?;
            update_data.insert("mobile".to_string(), json!(mobile.trim()));
        }
        if let Some(alt_mobile) = request.alt_mobile {
            if alt_mobile.trim().is_empty() {
                update_data.insert("alt_mobile".to_string(), Value::Null);
            } else {
                check_mobile("altMobile", &alt_mobile)?;
                update_data.insert("alt_mobile".to_string(), json!(alt_mobile.trim()));
            }
        }
        if let Some(age) = request.age {
            check_age(age)?;
            update_data.insert("age".to_string(), json!(age));
        }
        if let Some(sex) = request.sex {
            update_data.insert("sex".to_string(), json!(sex));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(date) = request.first_visit_date {
            update_data.insert("first_visit_date".to_string(), json!(date));
        }
        if request.blood_group.is_some() {
            let blood_group = check_blood_group(request.blood_group.as_deref())?;
            update_data.insert("blood_group".to_string(), json!(blood_group));
        }

        if update_data.is_empty() {
            return self.get_patient(patient_id).await;
        }

        self.patch(patient_id, Value::Object(update_data)).await
    }

    pub async fn delete_patient(&self, patient_id: i64) -> Result<(), AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if rows.is_empty() {
            return Err(PatientError::NotFound(patient_id).into());
        }

        info!("Deleted patient {} and their visits", patient_id);
        Ok(())
    }

    pub async fn upload_document(
        &self,
        patient_id: i64,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Patient, AppError> {
        // fail before storing anything for an unknown patient
        self.get_patient(patient_id).await?;

        let object_path = format!("patients/{}/{}-{}", patient_id, Uuid::new_v4(), sanitize_file_name(file_name));
        let url = self.supabase
            .upload_object(&self.bucket, &object_path, bytes, content_type)
            .await?;

        info!("Stored registration document for patient {}", patient_id);
        self.patch(patient_id, json!({ "registration_document": url })).await
    }

    pub async fn visit_history(&self, patient_id: i64) -> Result<Vec<VisitHistoryRow>, AppError> {
        let path = format!(
            "/rest/v1/visits?patient_id=eq.{}&select=date,doctor_name,diagnosis,treatment_plan&order=date.desc",
            patient_id
        );
        let rows: Vec<VisitHistoryRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }

    async fn patch(&self, patient_id: i64, body: Value) -> Result<Patient, AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let rows: Vec<Patient> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| PatientError::NotFound(patient_id).into())
    }
}
