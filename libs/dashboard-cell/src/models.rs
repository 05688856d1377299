use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const CHART_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCard {
    pub name: &'static str,
    pub value: String,
    pub change: String,
    pub change_type: &'static str,
}

impl StatCard {
    pub fn count(name: &'static str, value: u64) -> Self {
        Self {
            name,
            value: value.to_string(),
            change: String::new(),
            change_type: "neutral",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChartPoint {
    pub name: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub stats: Vec<StatCard>,
    pub chart_data: Vec<ChartPoint>,
}

/// The chart's days for the week ending `today`, oldest first.
pub fn chart_days(today: NaiveDate) -> Vec<NaiveDate> {
    (0..CHART_DAYS)
        .rev()
        .map(|offset| today - Duration::days(offset))
        .collect()
}

/// Pairs each day with its visit count, labelled "Mon", "Tue", ...
pub fn chart_series(days: &[NaiveDate], counts: &[u64]) -> Vec<ChartPoint> {
    days.iter()
        .zip(counts)
        .map(|(day, visits)| ChartPoint {
            name: day.format("%a").to_string(),
            visits: *visits,
        })
        .collect()
}
