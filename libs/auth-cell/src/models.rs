use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::Role;

/// Columns safe to read back; the password hash is only selected for login.
pub const USER_COLUMNS: &str =
    "id,username,first_name,last_name,email,role,avatar,mobile,is_superuser,is_active,created_at";

// ==============================================================================
// STORE ROWS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub mobile: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl UserRow {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn reported_role(&self) -> Role {
        if self.is_superuser {
            Role::Admin
        } else {
            self.role
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.display_name(),
            role: self.role,
            is_superuser: self.is_superuser,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialRow {
    #[serde(flatten)]
    pub user: UserRow,
    pub password_hash: String,
}

// ==============================================================================
// API SHAPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub mobile: Option<String>,
}

impl From<&UserRow> for UserProfile {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username.clone(),
            name: row.display_name(),
            email: row.email.clone(),
            role: row.reported_role(),
            avatar: row.avatar.clone(),
            mobile: row.mobile.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub avatar: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "first_name")]
    pub first_name: Option<String>,
    #[serde(alias = "last_name")]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub avatar: Option<String>,
    pub mobile: Option<String>,
}

/// Splits a display name into first and last name on the first space.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}
