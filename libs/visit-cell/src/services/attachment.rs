use reqwest::Method;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;
use shared_utils::upload::{sanitize_file_name, UploadedFile};

use crate::models::VisitAttachment;

/// Files attached to a visit: bytes in storage, metadata in `visit_attachments`.
pub struct AttachmentService {
    supabase: SupabaseClient,
    bucket: String,
}

impl AttachmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.storage_bucket.clone(),
        }
    }

    pub async fn upload(
        &self,
        visit_id: i64,
        file: UploadedFile,
        uploaded_by: Uuid,
    ) -> Result<VisitAttachment, AppError> {
        self.ensure_visit(visit_id).await?;

        let object_path = format!(
            "visits/{}/{}-{}",
            visit_id,
            Uuid::new_v4(),
            sanitize_file_name(&file.file_name)
        );
        let file_url = self.supabase
            .upload_object(&self.bucket, &object_path, file.bytes, &file.content_type)
            .await?;

        let rows: Vec<VisitAttachment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/visit_attachments",
            Some(json!({
                "visit_id": visit_id,
                "file_url": file_url,
                "file_name": file.file_name,
                "content_type": file.content_type,
                "uploaded_by": uploaded_by,
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let attachment = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Attachment insert returned no row".to_string()))?;

        info!("Attached {} to visit {}", attachment.file_name, visit_id);
        Ok(attachment)
    }

    /// Newest first.
    pub async fn list(&self, visit_id: i64) -> Result<Vec<VisitAttachment>, AppError> {
        self.ensure_visit(visit_id).await?;

        let path = format!(
            "/rest/v1/visit_attachments?visit_id=eq.{}&order=uploaded_at.desc",
            visit_id
        );
        let rows: Vec<VisitAttachment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }

    async fn ensure_visit(&self, visit_id: i64) -> Result<(), AppError> {
        let path = format!("/rest/v1/visits?id=eq.{}&select=id", visit_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("Visit {} not found", visit_id)));
        }
        Ok(())
    }
}
