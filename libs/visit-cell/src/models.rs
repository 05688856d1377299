use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use shared_models::error::AppError;

/// Embedded relations fetched alongside every visit row.
pub const VISIT_SELECT: &str = "*,visit_treatments(*),visit_attachments(file_url,uploaded_at)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    Booked,
    InProgress,
    Completed,
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Booked => write!(f, "booked"),
            VisitStatus::InProgress => write!(f, "in_progress"),
            VisitStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// STORE ROWS
// ==============================================================================

/// A visit with its line items and attachment links embedded.
///
/// `amount_paid` mirrors the bill and is only written by the payment function.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub date: NaiveDate,
    pub doctor_name: String,
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub clinical_history: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: String,
    #[serde(default)]
    pub investigations: String,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub no_follow_up_needed: bool,
    #[serde(default)]
    pub status: VisitStatus,
    pub consultation_fee: Decimal,
    #[serde(default)]
    pub is_paid: bool,
    pub total_amount: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    #[serde(rename(deserialize = "visit_treatments"), default)]
    pub treatments: Vec<VisitTreatment>,
    #[serde(
        rename(deserialize = "visit_attachments"),
        default,
        serialize_with = "attachment_urls"
    )]
    pub attachments: Vec<AttachmentLink>,
    #[serde(skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Line item with the catalog price frozen at the time it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct VisitTreatment {
    pub id: i64,
    #[serde(skip_serializing)]
    pub visit_id: i64,
    pub treatment_id: i64,
    pub treatment_title: String,
    pub sittings: i32,
    pub cost_per_sitting: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentLink {
    pub file_url: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

fn attachment_urls<S: Serializer>(links: &[AttachmentLink], serializer: S) -> Result<S::Ok, S::Error> {
    let mut sorted: Vec<&AttachmentLink> = links.iter().collect();
    sorted.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    serializer.collect_seq(sorted.into_iter().map(|link| &link.file_url))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct VisitAttachment {
    pub id: i64,
    pub visit_id: i64,
    pub file_url: String,
    pub file_name: String,
    pub content_type: String,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

// ==============================================================================
// API SHAPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitRequest {
    pub patient_id: i64,
    pub date: Option<NaiveDate>,
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub clinical_history: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment_plan: String,
    #[serde(default)]
    pub investigations: String,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub no_follow_up_needed: bool,
    pub status: Option<VisitStatus>,
    pub consultation_fee: Option<Decimal>,
    #[serde(default)]
    pub is_paid: bool,
    pub total_amount: Option<Decimal>,
    pub payment_mode: Option<String>,
}

/// Fields a client may change after creation. `amountPaid` is not one of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVisitRequest {
    pub date: Option<NaiveDate>,
    pub doctor_name: Option<String>,
    pub clinical_history: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub investigations: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub no_follow_up_needed: Option<bool>,
    pub status: Option<VisitStatus>,
    pub consultation_fee: Option<Decimal>,
    pub is_paid: Option<bool>,
    pub total_amount: Option<Decimal>,
    #[serde(rename = "visit_treatments", alias = "visitTreatments")]
    pub visit_treatments: Option<Vec<LineItemRequest>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[serde(alias = "treatment")]
    pub treatment_id: i64,
    #[serde(default = "one_sitting")]
    pub sittings: i32,
}

fn one_sitting() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitListQuery {
    #[serde(rename = "patientId")]
    pub patient_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentUploaded {
    pub status: &'static str,
    pub attachment: VisitAttachment,
}

pub fn check_amount(field: &str, amount: Decimal) -> Result<Decimal, AppError> {
    if amount < Decimal::ZERO {
        return Err(AppError::ValidationError(format!("{} cannot be negative", field)));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::ValidationError(format!(
            "{} cannot have more than two decimal places",
            field
        )));
    }
    Ok(amount)
}

pub fn check_line_items(items: &[LineItemRequest]) -> Result<(), AppError> {
    match items.iter().find(|item| item.sittings < 1) {
        Some(item) => Err(AppError::ValidationError(format!(
            "sittings for treatment {} must be at least 1",
            item.treatment_id
        ))),
        None => Ok(()),
    }
}

/// Consultation fee plus every line total.
pub fn charges_total(consultation_fee: Decimal, treatments: &[VisitTreatment]) -> Decimal {
    consultation_fee + treatments.iter().map(|t| t.line_total).sum::<Decimal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn line(sittings: i32, cost: i64) -> VisitTreatment {
        VisitTreatment {
            id: 1,
            visit_id: 11,
            treatment_id: 3,
            treatment_title: "Kizhi".into(),
            sittings,
            cost_per_sitting: Decimal::from(cost),
            line_total: Decimal::from(cost) * Decimal::from(sittings),
        }
    }

    #[test]
    fn test_charges_total() {
        assert_eq!(charges_total(Decimal::from(500), &[line(2, 1000)]), Decimal::from(2500));
        assert_eq!(charges_total(Decimal::from(500), &[]), Decimal::from(500));
    }

    #[test]
    fn test_update_reads_frontend_line_item_key() {
        let request: UpdateVisitRequest = serde_json::from_value(json!({
            "diagnosis": "Amavata",
            "amountPaid": 9999,
            "visit_treatments": [{ "treatmentId": 3, "sittings": 2 }, { "treatment": 4 }]
        }))
        .unwrap();

        let items = request.visit_treatments.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].sittings, 2);
        assert_eq!(items[1].treatment_id, 4);
        assert_eq!(items[1].sittings, 1);
    }

    #[test]
    fn test_wire_shape() {
        let mut row = json!({
            "id": 11,
            "patient_id": 7,
            "date": "2024-03-22",
            "doctor_name": "Dr. S. Nair",
            "doctor_id": null,
            "notes": null,
            "follow_up_date": null,
            "status": "in_progress",
            "consultation_fee": 500,
            "total_amount": 2500,
            "amount_paid": 0
        });
        row["visit_attachments"] = json!([
            { "file_url": "https://store/old.pdf", "uploaded_at": "2024-03-22T09:00:00Z" },
            { "file_url": "https://store/new.pdf", "uploaded_at": "2024-03-23T09:00:00Z" }
        ]);

        let visit: Visit = serde_json::from_value(row).unwrap();
        let wire = serde_json::to_value(&visit).unwrap();

        assert_eq!(wire["patientId"], 7);
        assert_eq!(wire["status"], "in_progress");
        assert_eq!(wire["totalAmount"], "2500");
        assert_eq!(wire["treatments"], json!([]));
        assert_eq!(wire["attachments"], json!(["https://store/new.pdf", "https://store/old.pdf"]));
        assert!(wire.get("createdAt").is_none());
    }

    #[test]
    fn test_amount_and_sittings_checks() {
        assert_matches!(check_amount("consultationFee", Decimal::from(-1)), Err(AppError::ValidationError(_)));
        assert_matches!(check_amount("totalAmount", Decimal::new(10005, 3)), Err(AppError::ValidationError(_)));
        assert!(check_amount("totalAmount", Decimal::ZERO).is_ok());

        let zero = LineItemRequest { treatment_id: 3, sittings: 0 };
        assert_matches!(check_line_items(&[zero]), Err(AppError::ValidationError(_)));
        assert!(check_line_items(&[]).is_ok());
    }
}
