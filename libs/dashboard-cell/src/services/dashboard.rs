use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{chart_days, chart_series, DashboardStats, StatCard};

pub struct DashboardService {
    supabase: SupabaseClient,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, AppError> {
        let days = chart_days(today);

        // one exact count per day, so a busy week is never cut off at the row cap
        let day_paths: Vec<String> = days
            .iter()
            .map(|day| format!("/rest/v1/visits?select=id&date=eq.{}", day))
            .collect();
        let registrations_path = format!("/rest/v1/patients?select=id&first_visit_date=eq.{}", today);

        let total_patients = self.supabase.count("/rest/v1/patients?select=id");
        let new_registrations = self.supabase.count(&registrations_path);
        // a visit without a diagnosis still needs its report written up
        let pending_reports = self.supabase.count("/rest/v1/visits?select=id&diagnosis=eq.");
        let per_day = try_join_all(day_paths.iter().map(|p| self.supabase.count(p)));

        let (total_patients, new_registrations, pending_reports, per_day) =
            tokio::try_join!(total_patients, new_registrations, pending_reports, per_day)?;

        // the last chart day is today
        let visits_today = per_day.last().copied().unwrap_or_default();
        debug!(
            "Dashboard for {}: {} visits this week",
            today,
            per_day.iter().sum::<u64>()
        );

        Ok(DashboardStats {
            stats: vec![
                StatCard::count("Total Patients", total_patients),
                StatCard::count("Visits Today", visits_today),
                StatCard::count("New Registrations", new_registrations),
                StatCard::count("Pending Reports", pending_reports),
            ],
            chart_data: chart_series(&days, &per_day),
        })
    }
}
