use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_CLINIC_NAME: &str = "Sri Dhanvantari Clinic";
const DEFAULT_REGISTRATION_PREFIX: &str = "SD";
const DEFAULT_STORAGE_BUCKET: &str = "clinic-files";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub jwt_secret: String,
    pub clinic_name: String,
    pub registration_prefix: String,
    pub storage_bucket: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub max_upload_bytes: usize,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or_else(|_| DEFAULT_CLINIC_NAME.to_string()),
            registration_prefix: env::var("REGISTRATION_PREFIX")
                .unwrap_or_else(|_| DEFAULT_REGISTRATION_PREFIX.to_string()),
            storage_bucket: env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string()),
            access_token_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", 60),
            refresh_token_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", 7),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            port: parse_or("PORT", 8000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    /// Config pointing at a store URL with defaults for everything else.
    pub fn for_store(supabase_url: &str, service_key: &str, jwt_secret: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            supabase_service_key: service_key.to_string(),
            jwt_secret: jwt_secret.to_string(),
            clinic_name: DEFAULT_CLINIC_NAME.to_string(),
            registration_prefix: DEFAULT_REGISTRATION_PREFIX.to_string(),
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 7,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            port: 8000,
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
