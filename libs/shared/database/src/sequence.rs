use serde_json::json;
use tracing::debug;

use crate::error::DbError;
use crate::supabase::SupabaseClient;

/// Formats a human-readable code such as `SD-2024-001` or `BILL-2024-017`.
pub fn format_code(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:03}", prefix, year, sequence)
}

/// Per-year counters backed by the `next_sequence` stored function.
///
/// The function increments a `(scope, year)` row with `INSERT .. ON CONFLICT DO UPDATE`,
/// so two concurrent callers never observe the same value.
pub struct SequenceGenerator<'a> {
    supabase: &'a SupabaseClient,
}

impl<'a> SequenceGenerator<'a> {
    pub fn new(supabase: &'a SupabaseClient) -> Self {
        Self { supabase }
    }

    pub async fn next_value(&self, scope: &str, year: i32) -> Result<i64, DbError> {
        let value: i64 = self.supabase
            .rpc("next_sequence", json!({ "p_scope": scope, "p_year": year }))
            .await?;

        if value < 1 {
            return Err(DbError::Decode(format!("Sequence {} returned {}", scope, value)));
        }

        debug!("Allocated {} #{} for {}", scope, value, year);
        Ok(value)
    }

    pub async fn next_code(&self, scope: &str, prefix: &str, year: i32) -> Result<String, DbError> {
        let value = self.next_value(scope, year).await?;
        Ok(format_code(prefix, year, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_config::AppConfig;
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wiremock::matchers::{body_json, method, path};

    #[test]
    fn test_format_code_pads_to_three_digits() {
        assert_eq!(format_code("SD", 2024, 1), "SD-2024-001");
        assert_eq!(format_code("BILL", 2025, 42), "BILL-2025-042");
        assert_eq!(format_code("SD", 2024, 1234), "SD-2024-1234");
    }

    #[tokio::test]
    async fn test_next_code_uses_counter_function() {
        let server = MockServer::start().await;
        let client = SupabaseClient::new(&AppConfig::for_store(&server.uri(), "key", "secret"));

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/next_sequence"))
            .and(body_json(json!({ "p_scope": "patient", "p_year": 2024 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(7)))
            .expect(1)
            .mount(&server)
            .await;

        let code = SequenceGenerator::new(&client)
            .next_code("patient", "SD", 2024)
            .await
            .unwrap();

        assert_eq!(code, "SD-2024-007");
    }
}
