use axum::extract::Multipart;
use tracing::debug;

use shared_models::error::AppError;

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Pulls the `file` part out of a multipart body, ignoring other fields.
///
/// Returns `Ok(None)` when no `file` part was sent.
pub async fn read_file_field(multipart: &mut Multipart, max_bytes: usize) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read upload: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::BadRequest(format!(
                "File exceeds the {} byte upload limit",
                max_bytes
            )));
        }

        debug!("Received upload {} ({} bytes, {})", file_name, bytes.len(), content_type);
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}

/// Keeps storage keys to a safe character set.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if cleaned.trim_matches(['.', '_']).is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scan 1.pdf"), "scan_1.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\aadhaar.jpg"), "aadhaar.jpg");
        assert_eq!(sanitize_file_name(".."), "document");
    }
}
