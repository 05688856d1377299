//! Loads the default therapy catalog into the store, refreshing any existing
//! entry with the same title.

use anyhow::{bail, Context};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared_config::AppConfig;
use treatment_cell::catalog::default_treatments;
use treatment_cell::TreatmentService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("SUPABASE_URL, SUPABASE_SERVICE_KEY and JWT_SECRET must be set");
    }

    let treatments = TreatmentService::new(&config)
        .upsert_by_title(default_treatments())
        .await
        .context("seeding treatments")?;

    for treatment in &treatments {
        info!("{:<16} {}", treatment.title, treatment.price);
    }
    info!("Seeded {} treatments", treatments.len());

    Ok(())
}
