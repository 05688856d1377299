use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, JwtHeader, TokenType, User};

type HmacSha256 = Hmac<Sha256>;

/// Signs an HS256 token for `user` that expires after `ttl`.
pub fn issue_token(user: &User, token_type: TokenType, ttl: Duration, jwt_secret: &str) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        is_superuser: user.is_superuser,
        token_type,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_vec(&claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn validate_token(token: &str, jwt_secret: &str, expected: TokenType) -> Result<JwtClaims, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signature_string = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signature_string.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let header: JwtHeader = URL_SAFE_NO_PAD
        .decode(header_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| "Invalid header encoding".to_string())?;

    if header.alg != "HS256" {
        return Err(format!("Unsupported token algorithm: {}", header.alg));
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => bytes,
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_slice(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    let now = Utc::now().timestamp();
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    if claims.token_type != expected {
        return Err("Token has wrong type".to_string());
    }

    debug!("Token validated successfully for user: {}", claims.sub);
    Ok(claims)
}
