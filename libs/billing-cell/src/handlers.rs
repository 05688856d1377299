use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::access::{ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{parse_amount, AddPaymentRequest, BillSummary, PaymentMode, PaymentReceipt};
use crate::services::BillingService;

#[axum::debug_handler]
pub async fn add_payment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
    Json(request): Json<AddPaymentRequest>,
) -> Result<Json<PaymentReceipt>, AppError> {
    ensure(user.effective_role(), Action::RecordPayment)?;

    // Validate before touching the store so a bad request leaves the bill alone.
    let amount = parse_amount(request.amount.as_ref())?;
    let mode: PaymentMode = request.mode.as_deref().unwrap_or_default().parse()?;

    debug!("User {} paying {} on visit {}", user.id, amount, visit_id);

    let service = BillingService::new(&config);
    let receipt = service.record_payment(visit_id, amount, mode, Some(user.id)).await?;

    Ok(Json(receipt))
}

#[axum::debug_handler]
pub async fn get_bill(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(visit_id): Path<i64>,
) -> Result<Json<BillSummary>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = BillingService::new(&config);
    let summary = service.summary(visit_id).await?;

    Ok(Json(summary))
}
