use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Reception,
}

impl Default for Role {
    fn default() -> Self {
        Role::Doctor
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Doctor => write!(f, "doctor"),
            Role::Reception => write!(f, "reception"),
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "reception" => Ok(Role::Reception),
            other => Err(AppError::ValidationError(format!("Unknown role: {}", other))),
        }
    }
}

/// Operations that pass through the role gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAllUsers,
    CreateUser,
    UpdateAnyUser,
    UpdateOwnAccount,
    ChangeRole,
    DeleteUser,
    ReadRecords,
    WriteRecords,
    RecordPayment,
    ManageCatalog,
}

/// The single capability table consulted by every mutating endpoint.
pub fn can(role: Role, action: Action) -> bool {
    match action {
        Action::ListAllUsers
        | Action::CreateUser
        | Action::UpdateAnyUser
        | Action::ChangeRole
        | Action::DeleteUser => role == Role::Admin,
        Action::UpdateOwnAccount
        | Action::ReadRecords
        | Action::WriteRecords
        | Action::RecordPayment
        | Action::ManageCatalog => true,
    }
}

/// `can` as a `Result`, producing the 403 error handlers return.
pub fn ensure(role: Role, action: Action) -> Result<(), AppError> {
    if can(role, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(denial_message(action).to_string()))
    }
}

fn denial_message(action: Action) -> &'static str {
    match action {
        Action::CreateUser => "Only admins can create new users.",
        Action::DeleteUser => "Only admins can delete users.",
        Action::UpdateAnyUser => "You do not have permission to edit this user.",
        Action::ChangeRole => "Only admins can change roles.",
        Action::ListAllUsers => "Only admins can list all users.",
        _ => "You do not have permission to perform this action.",
    }
}
