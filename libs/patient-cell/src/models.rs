use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::validation::{require_non_empty, validate_mobile};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
    Other,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
            Sex::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub alt_mobile: Option<String>,
    pub age: i32,
    pub sex: Sex,
    #[serde(default)]
    pub address: String,
    pub reg_no: String,
    pub first_visit_date: NaiveDate,
    pub blood_group: Option<String>,
    pub registration_document: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: String,
    pub mobile: String,
    pub alt_mobile: Option<String>,
    pub age: i32,
    pub sex: Sex,
    #[serde(default)]
    pub address: String,
    pub reg_no: Option<String>,
    pub first_visit_date: Option<NaiveDate>,
    pub blood_group: Option<String>,
}

/// `regNo` is deliberately absent: once assigned it never changes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub alt_mobile: Option<String>,
    pub age: Option<i32>,
    pub sex: Option<Sex>,
    pub address: Option<String>,
    pub first_visit_date: Option<NaiveDate>,
    pub blood_group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

/// One line of the visit-history table in the PDF export.
#[derive(Debug, Clone, Deserialize)]
pub struct VisitHistoryRow {
    pub date: NaiveDate,
    #[serde(default)]
    pub doctor_name: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    InvalidField(String),

    #[error("Server Error: {0}")]
    Store(String),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(_) => AppError::NotFound(err.to_string()),
            PatientError::InvalidField(msg) => AppError::ValidationError(msg),
            // registration failures surface as client errors
            PatientError::Store(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

pub fn check_mobile(field: &str, mobile: &str) -> Result<(), PatientError> {
    if validate_mobile(mobile.trim()) {
        Ok(())
    } else {
        Err(PatientError::InvalidField(format!("{} is not a valid phone number", field)))
    }
}

pub fn check_age(age: i32) -> Result<(), PatientError> {
    if (0..=150).contains(&age) {
        Ok(())
    } else {
        Err(PatientError::InvalidField(format!("age must be between 0 and 150, got {}", age)))
    }
}

/// Normalizes a blood group; empty means unknown.
pub fn check_blood_group(value: Option<&str>) -> Result<Option<String>, PatientError> {
    let Some(raw) = value else { return Ok(None) };
    let normalized = raw.trim().to_uppercase().replace(' ', "");
    if normalized.is_empty() {
        return Ok(None);
    }
    if BLOOD_GROUPS.contains(&normalized.as_str()) {
        Ok(Some(normalized))
    } else {
        Err(PatientError::InvalidField(format!("Unknown blood group: {}", raw)))
    }
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        require_non_empty("name", &self.name).map_err(|_| PatientError::InvalidField("name is required".into()))?;
        check_mobile("mobile", &self.mobile)?;
        if let Some(alt) = self.alt_mobile.as_deref().filter(|m| !m.trim().is_empty()) {
            check_mobile("altMobile", alt)?;
        }
        check_age(self.age)?;
        if let Some(reg_no) = &self.reg_no {
            if reg_no.trim().is_empty() {
                return Err(PatientError::InvalidField("regNo cannot be blank".into()));
            }
        }
        Ok(())
    }
}

/// Free-text search term made safe for a PostgREST `or=(...)` filter.
pub fn search_term(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '"' | '*' | '\\' | '%'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
