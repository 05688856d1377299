use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SequenceGenerator, SupabaseClient};
use shared_models::error::AppError;
use shared_utils::clock::clinic_year;

use crate::models::{total_paid, Bill, BillStatus, BillSummary, Payment, PaymentMode, PaymentReceipt};

const BILL_SCOPE: &str = "bill";
const BILL_PREFIX: &str = "BILL";
/// Attempts for writes guarded by an expected payment sum before giving up with 409.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
struct VisitTotal {
    total_amount: Decimal,
}

/// What a visit edit needs to move its bill to a new total: the bill, the
/// payment sum it was read at, and the status the new total implies.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalChange {
    pub bill_id: i64,
    pub expected_paid: Decimal,
    pub status: BillStatus,
}

/// Bill lifecycle for a visit: lazy creation, payments, and total changes.
///
/// The stored functions `record_payment` and `update_visit` apply each change
/// in one transaction and refuse it if the payment sum moved since it was read,
/// in which case the operation is re-read and retried.
pub struct BillingService {
    supabase: SupabaseClient,
}

impl BillingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_bill(&self, visit_id: i64) -> Result<Option<Bill>, AppError> {
        let path = format!("/rest/v1/bills?visit_id=eq.{}", visit_id);
        let bills: Vec<Bill> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(bills.into_iter().next())
    }

    /// Returns the visit's bill, creating it from the visit total on first use.
    pub async fn ensure_bill(&self, visit_id: i64) -> Result<Bill, AppError> {
        if let Some(bill) = self.find_bill(visit_id).await? {
            return Ok(bill);
        }

        let grand_total = self.visit_total(visit_id).await?;
        let bill_number = self.next_bill_number().await?;

        debug!("Creating bill {} for visit {}", bill_number, visit_id);

        // A concurrent creator wins on the unique visit_id; ours is then skipped.
        let mut headers = HeaderMap::new();
        headers.insert(
            "prefer",
            HeaderValue::from_static("return=representation,resolution=ignore-duplicates"),
        );

        let created: Vec<Bill> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/bills?on_conflict=visit_id",
            Some(json!({
                "visit_id": visit_id,
                "bill_number": bill_number,
                "grand_total": grand_total,
                "status": BillStatus::Unpaid,
            })),
            Some(headers),
        ).await?;

        if let Some(bill) = created.into_iter().next() {
            info!("Created bill {} for visit {}", bill.bill_number, visit_id);
            return Ok(bill);
        }

        self.find_bill(visit_id)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("Could not create bill for visit {}", visit_id)))
    }

    /// Allocates the next `BILL-<year>-NNN` number for the clinic's current year.
    pub async fn next_bill_number(&self) -> Result<String, AppError> {
        let number = SequenceGenerator::new(&self.supabase)
            .next_code(BILL_SCOPE, BILL_PREFIX, clinic_year())
            .await?;
        Ok(number)
    }

    pub async fn payments(&self, bill_id: i64) -> Result<Vec<Payment>, AppError> {
        let path = format!("/rest/v1/payments?bill_id=eq.{}&order=paid_at.asc", bill_id);
        let payments: Vec<Payment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(payments)
    }

    pub async fn summary(&self, visit_id: i64) -> Result<BillSummary, AppError> {
        let bill = self.ensure_bill(visit_id).await?;
        let payments = self.payments(bill.id).await?;
        Ok(BillSummary::new(bill, payments))
    }

    pub async fn record_payment(
        &self,
        visit_id: i64,
        amount: Decimal,
        mode: PaymentMode,
        received_by: Option<Uuid>,
    ) -> Result<PaymentReceipt, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::ValidationError("amount must be greater than zero".to_string()));
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let bill = self.ensure_bill(visit_id).await?;
            let paid_before = total_paid(&self.payments(bill.id).await?);
            let paid_after = paid_before + amount;
            let status = BillStatus::derive(bill.grand_total, paid_after);

            let result = self.supabase.rpc::<Payment>("record_payment", json!({
                "p_bill_id": bill.id,
                "p_amount": amount,
                "p_mode": mode,
                "p_received_by": received_by,
                "p_expected_total": bill.grand_total,
                "p_expected_paid": paid_before,
                "p_status": status,
            })).await;

            match result {
                Ok(payment) => {
                    info!(
                        "Recorded payment {} of {} on bill {} ({} -> {})",
                        payment.id, amount, bill.bill_number, bill.status, status
                    );
                    return Ok(PaymentReceipt {
                        status,
                        payment_id: payment.id,
                        bill_number: bill.bill_number,
                        total_paid: paid_after,
                        balance: bill.grand_total - paid_after,
                    });
                }
                Err(e) if e.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    warn!("Bill {} changed while paying (attempt {}), retrying", bill.id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Conflict("Bill kept changing, payment not recorded".to_string()))
    }

    /// Reads what moving the visit's bill to `grand_total` involves. Nothing is
    /// written; `None` means the visit has no bill yet, and the bill will take
    /// the visit's total when it is first created.
    pub async fn prepare_total_change(
        &self,
        visit_id: i64,
        grand_total: Decimal,
    ) -> Result<Option<TotalChange>, AppError> {
        let Some(bill) = self.find_bill(visit_id).await? else {
            return Ok(None);
        };

        let paid = total_paid(&self.payments(bill.id).await?);
        let status = BillStatus::derive(grand_total, paid);
        debug!("Bill {} moves {} -> {} ({})", bill.bill_number, bill.grand_total, grand_total, status);

        Ok(Some(TotalChange {
            bill_id: bill.id,
            expected_paid: paid,
            status,
        }))
    }

    async fn visit_total(&self, visit_id: i64) -> Result<Decimal, AppError> {
        let path = format!("/rest/v1/visits?id=eq.{}&select=total_amount", visit_id);
        let rows: Vec<VisitTotal> = self.supabase.request(Method::GET, &path, None).await?;

        rows.into_iter()
            .next()
            .map(|row| row.total_amount)
            .ok_or_else(|| AppError::NotFound(format!("Visit {} not found", visit_id)))
    }
}
