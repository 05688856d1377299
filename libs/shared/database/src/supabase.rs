use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DbError;

/// Thin client over the PostgREST and Storage endpoints of a Supabase project.
///
/// Every call authenticates with the service key; row-level access is decided by
/// this API's own role policy, not by the store.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.service_key)
            .map_err(|_| DbError::InvalidRequest("Service key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|_| DbError::InvalidRequest("Service key is not a valid header value".to_string()))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    /// Headers asking PostgREST to echo the affected rows back.
    pub fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("return=representation"),
        );
        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body, extra_headers).await?;
        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Runs a request whose response body is not needed (204 or ignored).
    pub async fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), DbError> {
        self.send(method, path, body, None).await?;
        Ok(())
    }

    /// Calls a Postgres function exposed at `/rest/v1/rpc/<function>`.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }

    /// Exact row count for a table filter, read from `Content-Range`.
    pub async fn count(&self, path: &str) -> Result<u64, DbError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static("count=exact"),
        );

        let response = self.send(Method::HEAD, path, None, Some(headers)).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DbError::Decode("Missing Content-Range header".to_string()))?;

        parse_content_range_total(range)
    }

    /// Stores raw bytes in a storage bucket and returns the public URL.
    pub async fn upload_object(
        &self,
        bucket: &str,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, DbError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, object_path);
        debug!("Uploading {} bytes to {}", bytes.len(), url);

        let mut headers = self.get_headers()?;
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        headers.insert(CONTENT_TYPE, content_type);

        let response = self.client.post(&url).headers(headers).body(bytes).send().await?;
        Self::check_status(response).await?;

        Ok(self.get_public_url(bucket, object_path))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    pub fn get_public_url(&self, bucket: &str, object_path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, object_path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DbError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        error!("API error ({}): {}", status, error_text);

        Err(DbError::from_status(status.as_u16(), error_text))
    }
}

fn parse_content_range_total(range: &str) -> Result<u64, DbError> {
    range
        .rsplit('/')
        .next()
        .and_then(|total| total.trim().parse::<u64>().ok())
        .ok_or_else(|| DbError::Decode(format!("Unparseable Content-Range: {}", range)))
}
