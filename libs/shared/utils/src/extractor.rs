use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_models::auth::{TokenType, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Validates the bearer access token and stores the caller as a `User` extension.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !request.headers().contains_key("authorization") {
        return Err(AppError::Auth("Missing authorization header".to_string()));
    }

    let auth = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let claims = validate_token(auth.token(), &config.jwt_secret, TokenType::Access)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(User::from(claims));

    Ok(next.run(request).await)
}
