use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::access::{ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::clock::clinic_today;

use crate::models::DashboardStats;
use crate::services::DashboardService;

#[axum::debug_handler]
pub async fn get_stats(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardStats>, AppError> {
    ensure(user.effective_role(), Action::ReadRecords)?;

    let service = DashboardService::new(&config);
    let stats = service.stats(clinic_today()).await?;

    Ok(Json(stats))
}
