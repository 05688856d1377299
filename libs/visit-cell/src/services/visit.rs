use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use billing_cell::{BillStatus, BillingService, PaymentMode, MAX_WRITE_ATTEMPTS};
use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::clock::clinic_today;
use treatment_cell::TreatmentService;

use crate::models::{
    charges_total, check_amount, check_line_items, CreateVisitRequest, LineItemRequest,
    UpdateVisitRequest, Visit, VISIT_SELECT,
};

pub struct VisitService {
    supabase: SupabaseClient,
    treatments: TreatmentService,
    billing: BillingService,
}

impl VisitService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            treatments: TreatmentService::new(config),
            billing: BillingService::new(config),
        }
    }

    pub async fn list_visits(&self, patient_id: Option<i64>) -> Result<Vec<Visit>, AppError> {
        let mut path = format!(
            "/rest/v1/visits?select={}&order=date.desc,id.desc",
            VISIT_SELECT
        );
        if let Some(patient_id) = patient_id {
            path.push_str(&format!("&patient_id=eq.{}", patient_id));
        }

        let visits: Vec<Visit> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("Listed {} visits", visits.len());
        Ok(visits)
    }

    pub async fn get_visit(&self, visit_id: i64) -> Result<Visit, AppError> {
        let path = format!("/rest/v1/visits?id=eq.{}&select={}", visit_id, VISIT_SELECT);
        let rows: Vec<Visit> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Visit {} not found", visit_id)))
    }

    pub async fn create_visit(&self, request: CreateVisitRequest, author: &User) -> Result<Visit, AppError> {
        let fee = check_amount("consultationFee", request.consultation_fee.unwrap_or_default())?;
        let total = check_amount("totalAmount", request.total_amount.unwrap_or(fee))?;
        let payment_mode: PaymentMode = request.payment_mode.as_deref().unwrap_or_default().parse()?;

        self.ensure_patient(request.patient_id).await?;

        let doctor_name = request
            .doctor_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Dr. {}", author.name));

        let body = json!({
            "patient_id": request.patient_id,
            "date": request.date.unwrap_or_else(clinic_today),
            "doctor_name": doctor_name,
            "doctor_id": author.id,
            "clinical_history": request.clinical_history,
            "diagnosis": request.diagnosis,
            "treatment_plan": request.treatment_plan,
            "investigations": request.investigations,
            "notes": request.notes,
            "follow_up_date": request.follow_up_date,
            "no_follow_up_needed": request.no_follow_up_needed,
            "status": request.status.unwrap_or_default(),
            "consultation_fee": fee,
            "is_paid": request.is_paid,
            "total_amount": total,
        });

        if request.is_paid && fee > Decimal::ZERO {
            return self.open_paid_visit(body, fee, total, payment_mode, author).await;
        }

        let rows: Vec<Visit> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/visits",
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let visit = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Visit insert returned no row".to_string()))?;

        info!("Created visit {} for patient {}", visit.id, visit.patient_id);
        Ok(visit)
    }

    /// A fee paid at the desk is the visit's first payment. The visit, its bill
    /// and that payment are written by one stored function, so a failed payment
    /// leaves no visit behind.
    async fn open_paid_visit(
        &self,
        body: Value,
        fee: Decimal,
        total: Decimal,
        mode: PaymentMode,
        author: &User,
    ) -> Result<Visit, AppError> {
        let bill_number = self.billing.next_bill_number().await?;
        let status = BillStatus::derive(total, fee);

        let visit: Visit = self.supabase.rpc("open_paid_visit", json!({
            "p_visit": body,
            "p_bill_number": bill_number,
            "p_mode": mode,
            "p_received_by": author.id,
            "p_status": status,
        })).await?;

        info!(
            "Created visit {} for patient {} with fee {} paid on {} ({})",
            visit.id, visit.patient_id, fee, bill_number, status
        );
        self.get_visit(visit.id).await
    }

    pub async fn update_visit(&self, visit_id: i64, request: UpdateVisitRequest) -> Result<Visit, AppError> {
        let mut update_data = Map::new();

        if let Some(date) = request.date {
            update_data.insert("date".to_string(), json!(date));
        }
        if let Some(doctor_name) = request.doctor_name {
            update_data.insert("doctor_name".to_string(), json!(doctor_name.trim()));
        }
        if let Some(clinical_history) = request.clinical_history {
            update_data.insert("clinical_history".to_string(), json!(clinical_history));
        }
        if let Some(diagnosis) = request.diagnosis {
            update_data.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(treatment_plan) = request.treatment_plan {
            update_data.insert("treatment_plan".to_string(), json!(treatment_plan));
        }
        if let Some(investigations) = request.investigations {
            update_data.insert("investigations".to_string(), json!(investigations));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        if let Some(follow_up_date) = request.follow_up_date {
            update_data.insert("follow_up_date".to_string(), json!(follow_up_date));
        }
        if let Some(no_follow_up_needed) = request.no_follow_up_needed {
            update_data.insert("no_follow_up_needed".to_string(), json!(no_follow_up_needed));
        }
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(fee) = request.consultation_fee {
            update_data.insert("consultation_fee".to_string(), json!(check_amount("consultationFee", fee)?));
        }
        if let Some(is_paid) = request.is_paid {
            update_data.insert("is_paid".to_string(), json!(is_paid));
        }
        let total_amount = request
            .total_amount
            .map(|total| check_amount("totalAmount", total))
            .transpose()?;
        if let Some(total) = total_amount {
            update_data.insert("total_amount".to_string(), json!(total));
        }

        // every lookup happens before the single write
        let items = match &request.visit_treatments {
            Some(items) => {
                check_line_items(items)?;
                Some(self.price_line_items(items).await?)
            }
            None => None,
        };

        if update_data.is_empty() && items.is_none() {
            return self.get_visit(visit_id).await;
        }

        self.apply_update(visit_id, Value::Object(update_data), items, total_amount).await?;

        let visit = self.get_visit(visit_id).await?;
        let charges = charges_total(visit.consultation_fee, &visit.treatments);
        if total_amount.is_some() && charges != visit.total_amount {
            debug!("Visit {} total {} differs from itemised charges {}", visit_id, visit.total_amount, charges);
        }

        info!("Updated visit {}", visit_id);
        Ok(visit)
    }

    /// Resolves each requested treatment against the catalog and snapshots its
    /// title and current price. Fails with 404 on the first unknown id.
    async fn price_line_items(&self, items: &[LineItemRequest]) -> Result<Vec<Value>, AppError> {
        let mut ids: Vec<i64> = items.iter().map(|item| item.treatment_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let catalog = self.treatments.get_many(&ids).await?;

        items
            .iter()
            .map(|item| {
                let treatment = catalog
                    .iter()
                    .find(|t| t.id == item.treatment_id)
                    .ok_or_else(|| AppError::NotFound(format!("Treatment {} not found", item.treatment_id)))?;

                Ok(json!({
                    "treatment_id": treatment.id,
                    "treatment_title": treatment.title,
                    "sittings": item.sittings,
                    "cost_per_sitting": treatment.price,
                }))
            })
            .collect()
    }

    /// Writes the scalar patch, the priced line items (replacing the whole list)
    /// and the bill total through the `update_visit` stored function. A 409
    /// means a payment or bill landed in between; the bill is re-read and the
    /// write retried.
    async fn apply_update(
        &self,
        visit_id: i64,
        patch: Value,
        items: Option<Vec<Value>>,
        total_amount: Option<Decimal>,
    ) -> Result<Visit, AppError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let change = match total_amount {
                Some(total) => self.billing.prepare_total_change(visit_id, total).await?,
                None => None,
            };

            let result = self.supabase.rpc::<Visit>("update_visit", json!({
                "p_visit_id": visit_id,
                "p_patch": patch,
                "p_items": items,
                "p_bill_id": change.as_ref().map(|c| c.bill_id),
                "p_expected_paid": change.as_ref().map(|c| c.expected_paid),
                "p_status": change.as_ref().map(|c| c.status),
            })).await;

            match result {
                Ok(visit) => return Ok(visit),
                Err(e) if e.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    warn!("Bill for visit {} changed while updating (attempt {}), retrying", visit_id, attempt);
                }
                Err(DbError::NotFound(_)) => {
                    return Err(AppError::NotFound(format!("Visit {} not found", visit_id)));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict("Bill kept changing, visit not updated".to_string()))
    }

    pub async fn delete_visit(&self, visit_id: i64) -> Result<(), AppError> {
        let path = format!("/rest/v1/visits?id=eq.{}&select=id", visit_id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("Visit {} not found", visit_id)));
        }

        warn!("Deleted visit {} with its line items, attachments and bill", visit_id);
        Ok(())
    }

    async fn ensure_patient(&self, patient_id: i64) -> Result<(), AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("Patient {} not found", patient_id)));
        }
        Ok(())
    }
}
