use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::instrument;

use shared_models::error::AppError;

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::ValidationError("password is required".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
