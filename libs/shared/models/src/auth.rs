use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub is_superuser: bool,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated staff member attached to each request by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl User {
    /// Superusers act as admins regardless of their stored role.
    pub fn effective_role(&self) -> Role {
        if self.is_superuser {
            Role::Admin
        } else {
            self.role
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

impl From<JwtClaims> for User {
    fn from(claims: JwtClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            role: claims.role,
            is_superuser: claims.is_superuser,
        }
    }
}
