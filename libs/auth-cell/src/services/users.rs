use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::access::{can, ensure, Action};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::Role;
use shared_utils::validation::{require_non_empty, validate_email, validate_mobile};

use crate::models::{
    split_name, CreateUserRequest, CredentialRow, UpdateUserRequest, UserRow, USER_COLUMNS,
};
use crate::services::PasswordService;

pub struct UserService {
    supabase: SupabaseClient,
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_credentials(&self, email: &str) -> Result<Option<CredentialRow>, AppError> {
        let email = email.trim().to_lowercase();
        let path = format!(
            "/rest/v1/users?email=eq.{}&select={},password_hash",
            urlencoding::encode(&email),
            USER_COLUMNS
        );
        let rows: Vec<CredentialRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn get(&self, id: Uuid) -> Result<UserRow, AppError> {
        let path = format!("/rest/v1/users?id=eq.{}&select={}", id, USER_COLUMNS);
        let rows: Vec<UserRow> = self.supabase.request(Method::GET, &path, None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Admins see everyone; everybody else sees only their own account.
    pub async fn list(&self, caller: &User) -> Result<Vec<UserRow>, AppError> {
        if !can(caller.effective_role(), Action::ListAllUsers) {
            return Ok(vec![self.get(caller.id).await?]);
        }

        let path = format!("/rest/v1/users?select={}&order=created_at.asc", USER_COLUMNS);
        let rows: Vec<UserRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows)
    }

    pub async fn get_for(&self, caller: &User, id: Uuid) -> Result<UserRow, AppError> {
        if caller.id != id {
            ensure(caller.effective_role(), Action::ListAllUsers)?;
        }
        self.get(id).await
    }

    #[instrument(skip(self, caller, request), fields(email = %request.email))]
    pub async fn create(&self, caller: &User, request: CreateUserRequest) -> Result<UserRow, AppError> {
        ensure(caller.effective_role(), Action::CreateUser)?;

        let email = request.email.trim().to_lowercase();
        if !validate_email(&email) {
            return Err(AppError::ValidationError(format!("Invalid email: {}", request.email)));
        }
        if let Some(mobile) = request.mobile.as_deref() {
            if !mobile.is_empty() && !validate_mobile(mobile) {
                return Err(AppError::ValidationError(format!("Invalid mobile: {}", mobile)));
            }
        }

        let password_hash = PasswordService::hash_password(&request.password)?;

        let (first_name, last_name) = match (&request.first_name, &request.last_name, &request.name) {
            (None, None, Some(name)) => split_name(name),
            _ => (
                request.first_name.clone().unwrap_or_default(),
                request.last_name.clone().unwrap_or_default(),
            ),
        };

        let username = match request.username.as_deref() {
            Some(username) => require_non_empty("username", username)?,
            None => email.clone(),
        };

        let body = json!({
            "username": username,
            "first_name": first_name.trim(),
            "last_name": last_name.trim(),
            "email": email,
            "role": request.role.unwrap_or_default(),
            "avatar": request.avatar,
            "mobile": request.mobile.filter(|m| !m.is_empty()),
            "password_hash": password_hash,
        });

        let path = format!("/rest/v1/users?select={}", USER_COLUMNS);
        let rows: Vec<UserRow> = self.supabase.request_with_headers(
            Method::POST,
            &path,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let created = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("User insert returned no row".to_string()))?;

        info!("User {} created {} account {}", caller.id, created.role, created.id);
        Ok(created)
    }

    #[instrument(skip(self, caller, request))]
    pub async fn update(&self, caller: &User, id: Uuid, request: UpdateUserRequest) -> Result<UserRow, AppError> {
        let role = caller.effective_role();
        if caller.id != id {
            ensure(role, Action::UpdateAnyUser)?;
        } else {
            ensure(role, Action::UpdateOwnAccount)?;
        }

        let current = self.get(id).await?;
        let patch = build_patch(&current, role, request)?;

        if patch.is_empty() {
            debug!("Nothing to update for user {}", id);
            return Ok(current);
        }

        let path = format!("/rest/v1/users?id=eq.{}&select={}", id, USER_COLUMNS);
        let rows: Vec<UserRow> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(Value::Object(patch)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let updated = rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        info!("User {} updated account {}", caller.id, id);
        Ok(updated)
    }

    pub async fn delete(&self, caller: &User, id: Uuid) -> Result<(), AppError> {
        ensure(caller.effective_role(), Action::DeleteUser)?;

        if caller.id == id {
            return Err(AppError::Conflict("You cannot delete your own account.".to_string()));
        }

        let path = format!("/rest/v1/users?id=eq.{}&select=id", id);
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        info!("User {} deleted account {}", caller.id, id);
        Ok(())
    }
}

/// Column changes for an update; role changes need `ChangeRole` even on one's own account.
fn build_patch(current: &UserRow, caller_role: Role, request: UpdateUserRequest) -> Result<Map<String, Value>, AppError> {
    let mut patch = Map::new();

    if let Some(new_role) = request.role {
        if new_role != current.role {
            ensure(caller_role, Action::ChangeRole)?;
            patch.insert("role".into(), json!(new_role));
        }
    }

    if let Some(email) = request.email {
        let email = email.trim().to_lowercase();
        if !validate_email(&email) {
            return Err(AppError::ValidationError(format!("Invalid email: {}", email)));
        }
        patch.insert("email".into(), json!(email));
    }

    if let Some(password) = request.password {
        patch.insert("password_hash".into(), json!(PasswordService::hash_password(&password)?));
    }

    if let Some(username) = request.username {
        patch.insert("username".into(), json!(require_non_empty("username", &username)?));
    }

    if let Some(name) = request.name {
        let (first, last) = split_name(&name);
        patch.insert("first_name".into(), json!(first));
        patch.insert("last_name".into(), json!(last));
    }
    if let Some(first) = request.first_name {
        patch.insert("first_name".into(), json!(first.trim()));
    }
    if let Some(last) = request.last_name {
        patch.insert("last_name".into(), json!(last.trim()));
    }

    if let Some(mobile) = request.mobile {
        if !mobile.is_empty() && !validate_mobile(&mobile) {
            return Err(AppError::ValidationError(format!("Invalid mobile: {}", mobile)));
        }
        patch.insert("mobile".into(), if mobile.is_empty() { Value::Null } else { json!(mobile) });
    }

    if let Some(avatar) = request.avatar {
        patch.insert("avatar".into(), json!(avatar));
    }

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn current(role: Role) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "doc@clinic.in".to_string(),
            first_name: "Suresh".to_string(),
            last_name: "Nair".to_string(),
            email: "doc@clinic.in".to_string(),
            role,
            avatar: None,
            mobile: None,
            is_superuser: false,
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_doctor_cannot_promote_self() {
        let request = UpdateUserRequest {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert_matches!(
            build_patch(&current(Role::Doctor), Role::Doctor, request),
            Err(AppError::PermissionDenied(_))
        );
    }

    #[test]
    fn test_unchanged_role_is_not_a_role_change() {
        let request = UpdateUserRequest {
            role: Some(Role::Doctor),
            mobile: Some("9876543210".to_string()),
            ..Default::default()
        };
        let patch = build_patch(&current(Role::Doctor), Role::Doctor, request).unwrap();
        assert!(!patch.contains_key("role"));
        assert_eq!(patch["mobile"], "9876543210");
    }

    #[test]
    fn test_password_is_rehashed() {
        let request = UpdateUserRequest {
            password: Some("new-secret".to_string()),
            email: Some(" Doc@Clinic.IN ".to_string()),
            ..Default::default()
        };
        let patch = build_patch(&current(Role::Doctor), Role::Admin, request).unwrap();
        assert!(patch["password_hash"].as_str().unwrap().starts_with("$argon2"));
        assert!(!patch.contains_key("password"));
        assert_eq!(patch["email"], "doc@clinic.in");
    }
}
