use reqwest::{header::{HeaderMap, HeaderValue}, Method};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;
use shared_utils::validation::require_non_empty;

use crate::models::{check_price, NewTreatment, Treatment, UpdateTreatmentRequest};

pub struct TreatmentService {
    supabase: SupabaseClient,
}

impl TreatmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self) -> Result<Vec<Treatment>, AppError> {
        let treatments: Vec<Treatment> = self.supabase
            .request(Method::GET, "/rest/v1/treatments?order=title.asc", None)
            .await?;
        Ok(treatments)
    }

    pub async fn get(&self, id: i64) -> Result<Treatment, AppError> {
        let path = format!("/rest/v1/treatments?id=eq.{}", id);
        let rows: Vec<Treatment> = self.supabase.request(Method::GET, &path, None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Treatment {} not found", id)))
    }

    /// Fetches every listed treatment, failing on the first id the catalog lacks.
    pub async fn get_many(&self, ids: &[i64]) -> Result<Vec<Treatment>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/treatments?id=in.({})", id_list);
        let rows: Vec<Treatment> = self.supabase.request(Method::GET, &path, None).await?;

        if let Some(missing) = ids.iter().find(|id| !rows.iter().any(|t| t.id == **id)) {
            return Err(AppError::NotFound(format!("Treatment {} not found", missing)));
        }
        Ok(rows)
    }

    pub async fn create(&self, request: NewTreatment) -> Result<Treatment, AppError> {
        let treatment = request.validated()?;
        debug!("Adding treatment {}", treatment.title);

        let rows: Vec<Treatment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/treatments",
            Some(json!(treatment)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let created = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Treatment insert returned no row".to_string()))?;

        info!("Added treatment {} at {}", created.title, created.price);
        Ok(created)
    }

    /// Price changes only affect line items added afterwards.
    pub async fn update(&self, id: i64, request: UpdateTreatmentRequest) -> Result<Treatment, AppError> {
        let mut update_data = Map::new();

        if let Some(title) = request.title {
            update_data.insert("title".to_string(), json!(require_non_empty("title", &title)?));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }
        if let Some(image) = request.image {
            update_data.insert("image".to_string(), json!(image));
        }
        if let Some(price) = request.price {
            check_price(price)?;
            update_data.insert("price".to_string(), json!(price));
        }

        if update_data.is_empty() {
            return self.get(id).await;
        }

        let path = format!("/rest/v1/treatments?id=eq.{}", id);
        let rows: Vec<Treatment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let updated = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Treatment {} not found", id)))?;

        info!("Updated treatment {}", updated.id);
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let path = format!("/rest/v1/treatments?id=eq.{}&select=id", id);
        let result = self.supabase.request_with_headers::<Vec<Value>>(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await;

        let rows = match result {
            Ok(rows) => rows,
            // visit line items restrict deletion of a treatment they reference
            Err(e) if e.is_conflict() => {
                warn!("Treatment {} is referenced by visits, not deleted", id);
                return Err(AppError::Conflict(format!(
                    "Treatment {} is used by past visits and cannot be deleted",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("Treatment {} not found", id)));
        }

        info!("Removed treatment {}", id);
        Ok(())
    }

    /// Inserts or refreshes catalog entries keyed by title.
    pub async fn upsert_by_title(&self, treatments: Vec<NewTreatment>) -> Result<Vec<Treatment>, AppError> {
        let treatments = treatments
            .into_iter()
            .map(NewTreatment::validated)
            .collect::<Result<Vec<_>, _>>()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "prefer",
            HeaderValue::from_static("return=representation,resolution=merge-duplicates"),
        );

        let rows: Vec<Treatment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/treatments?on_conflict=title",
            Some(json!(treatments)),
            Some(headers),
        ).await?;

        info!("Upserted {} treatments", rows.len());
        Ok(rows)
    }
}
