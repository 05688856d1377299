use chrono::Duration;
use tracing::{info, instrument, warn};

use shared_config::AppConfig;
use shared_models::auth::{TokenType, User};
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, validate_token};

use crate::models::{LoginResponse, RefreshResponse};
use crate::services::{PasswordService, UserService};

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Email/password login and token refresh.
pub struct SessionService<'a> {
    config: &'a AppConfig,
    users: UserService,
}

impl<'a> SessionService<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self {
            config,
            users: UserService::new(config),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let credentials = self.users
            .find_credentials(email)
            .await?
            .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let verified = PasswordService::verify_password(password, &credentials.password_hash)
            .unwrap_or_else(|e| {
                warn!("Unreadable password hash for user {}: {}", credentials.user.id, e);
                false
            });

        if !verified || !credentials.user.is_active {
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        let row = credentials.user;
        let user = row.to_user();
        info!("User {} logged in", user.id);

        Ok(LoginResponse {
            access: self.issue(&user, TokenType::Access)?,
            refresh: self.issue(&user, TokenType::Refresh)?,
            id: row.id,
            name: row.display_name(),
            email: row.email.clone(),
            role: row.reported_role(),
            avatar: row.avatar.clone(),
        })
    }

    /// Exchanges a refresh token for a new access token carrying the account's current role.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let claims = validate_token(refresh_token, &self.config.jwt_secret, TokenType::Refresh)
            .map_err(AppError::Auth)?;

        let row = self.users.get(claims.sub).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::Auth("User no longer exists".to_string()),
            other => other,
        })?;

        if !row.is_active {
            return Err(AppError::Auth("User account is disabled".to_string()));
        }

        Ok(RefreshResponse {
            access: self.issue(&row.to_user(), TokenType::Access)?,
        })
    }

    fn issue(&self, user: &User, token_type: TokenType) -> Result<String, AppError> {
        let ttl = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_ttl_minutes),
            TokenType::Refresh => Duration::days(self.config.refresh_token_ttl_days),
        };
        issue_token(user, token_type, ttl, &self.config.jwt_secret).map_err(AppError::Internal)
    }
}
